//! Resolves imports, loads modules, detects import cycles, and topologically
//! sorts the module dependency graph (`spec.md` §4.4).
//!
//! Grounded on the teacher's `compiler_frontend::module_dependencies`
//! (temp-mark/visited DFS over a path-keyed graph, reporting a circular
//! dependency the moment a back-edge is found) generalized from a
//! single-file header graph to `spec.md`'s module-of-files model: a module
//! may be a single `.bry` file or a directory of them, it owns a mutable
//! symbol table and declaration list populated while loading, and cycle
//! detection operates over modules rather than individual files.

use crate::ast::{Decl as AstDecl, DeclKind as AstDeclKind, Parser};
use crate::compiler_messages::compiler_errors::{CompileError, CompilerMessages, ErrorKind};
use crate::module::{Module, SourceFile};
use crate::module_path::ModulePath;
use crate::settings::{Config, BRY_FILE_EXTENSION, CORE_MODULE_NAME};
use crate::string_interning::StringTable;
use crate::symbol::{Decl, DeclKindTag, Symbol, SymbolFlags};
use crate::tokenizer::tokens::{FileTokens, Span};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

fn decl_kind_tag(kind: &AstDeclKind) -> DeclKindTag {
    match kind {
        AstDeclKind::Func { receiver, factory_of, .. } => {
            if factory_of.is_some() {
                DeclKindTag::Factory
            } else if receiver.is_some() {
                DeclKindTag::Method
            } else {
                DeclKindTag::Func
            }
        }
        AstDeclKind::Global { is_const, .. } => {
            if *is_const {
                DeclKindTag::GlobalConst
            } else {
                DeclKindTag::GlobalVar
            }
        }
        AstDeclKind::Struct { .. } => DeclKindTag::Struct,
        AstDeclKind::Alias { .. } => DeclKindTag::Alias,
        AstDeclKind::Enum { .. } => DeclKindTag::Enum,
    }
}

fn symbol_flags_for(kind: DeclKindTag, exported: bool) -> SymbolFlags {
    let mut flags = match kind {
        DeclKindTag::Func | DeclKindTag::Method | DeclKindTag::Factory => SymbolFlags::FUNC,
        DeclKindTag::GlobalVar => SymbolFlags::VAR,
        DeclKindTag::GlobalConst => SymbolFlags::CONST,
        DeclKindTag::Struct | DeclKindTag::Alias | DeclKindTag::Enum => SymbolFlags::TYPE,
    };
    if exported {
        flags.insert(SymbolFlags::EXPORTED);
    }
    flags
}

/// Loads and links the module graph reachable from a configured entry
/// point, in the style of the teacher's single-pass `CompilerFrontend`
/// phase methods.
pub struct Loader<'a> {
    config: &'a Config,
    table: &'a mut StringTable,
    messages: &'a mut CompilerMessages,
    modules: Vec<Module>,
    by_path: FxHashMap<PathBuf, u32>,
    /// Recursion stack of absolute paths currently being loaded, used for
    /// cycle detection (`spec.md` §4.4 step 3: "maintain a visiting set").
    stack: Vec<PathBuf>,
    core_module_id: Option<u32>,
}

impl<'a> Loader<'a> {
    pub fn new(config: &'a Config, table: &'a mut StringTable, messages: &'a mut CompilerMessages) -> Self {
        Self {
            config,
            table,
            messages,
            modules: Vec::new(),
            by_path: FxHashMap::default(),
            stack: Vec::new(),
            core_module_id: None,
        }
    }

    /// Loads the configured entry point and every module it transitively
    /// imports. Returns the root module's id on success; `None` if a fatal
    /// load error made the root module unusable (diagnostics have already
    /// been pushed to `messages`).
    pub fn load_root(&mut self) -> Option<u32> {
        // The core module (if configured) is loaded first so every other
        // module's implicit dependency resolves without re-entering the
        // loader mid-load (`spec.md` §4.4 step 4).
        if let Some(core_path) = self.find_core_module_path() {
            self.core_module_id = self.load_module_at(core_path, ModulePath::single(self.table.intern(CORE_MODULE_NAME)));
        }

        let entry = self.config.entry.clone();
        let name = ModulePath::from_dotted(&module_stem(&entry), self.table);
        self.load_module_at(entry, name)
    }

    pub fn into_modules(self) -> (Vec<Module>, Option<u32>) {
        (self.modules, self.core_module_id)
    }

    fn find_core_module_path(&self) -> Option<PathBuf> {
        for root in &self.config.import_roots {
            let file = root.join(CORE_MODULE_NAME).with_extension(BRY_FILE_EXTENSION);
            if file.is_file() {
                return Some(file);
            }
            let dir = root.join(CORE_MODULE_NAME);
            if dir.is_dir() {
                return Some(dir);
            }
        }
        None
    }

    /// Loads (or returns the already-loaded id for) the module rooted at
    /// `abs_path`, recursing into its imports.
    fn load_module_at(&mut self, abs_path: PathBuf, default_name: ModulePath) -> Option<u32> {
        let canonical = abs_path.clone();
        if let Some(&id) = self.by_path.get(&canonical) {
            return Some(id);
        }
        if let Some(pos) = self.stack.iter().position(|p| p == &canonical) {
            self.report_cycle(pos, &canonical);
            return None;
        }

        self.stack.push(canonical.clone());
        let files = match collect_source_files(&abs_path) {
            Ok(files) => files,
            Err(msg) => {
                self.messages.push_error(CompileError::new(
                    ErrorKind::Module,
                    default_name.display_name(self.table),
                    abs_path.clone(),
                    Span::default(),
                    msg,
                ));
                self.stack.pop();
                return None;
            }
        };

        let module_id = self.modules.len() as u32;
        let mut header_name: Option<String> = None;
        let mut parsed_files = Vec::new();

        for (file_idx, file_path) in files.iter().enumerate() {
            let Ok(source) = std::fs::read_to_string(file_path) else {
                self.messages.push_error(CompileError::new(
                    ErrorKind::Module,
                    default_name.display_name(self.table),
                    file_path.clone(),
                    Span::default(),
                    format!("could not read source file '{}'", file_path.display()),
                ));
                continue;
            };

            let tokens = match crate::tokenizer::lex_source(&source, self.table) {
                Ok(t) => t,
                Err(e) => {
                    self.messages.push_error(CompileError::new(
                        ErrorKind::Lexical,
                        default_name.display_name(self.table),
                        file_path.clone(),
                        e.span,
                        e.message,
                    ));
                    continue;
                }
            };

            let ft = FileTokens::new(ModulePath::new(), tokens);
            let module_name_guess = header_name.clone().unwrap_or_else(|| default_name.display_name(self.table));
            let parser = Parser::new(ft, self.table, &self.config.platform, file_path.clone(), module_name_guess, self.messages);
            let parsed = parser.parse_file();
            if header_name.is_none() {
                if let Some(id) = parsed.module_name {
                    header_name = Some(self.table.resolve(id).to_string());
                }
            }
            parsed_files.push((file_idx as u32, file_path.clone(), parsed));
        }

        let module_name = header_name.unwrap_or_else(|| default_name.display_name(self.table));
        let module_path = if default_name.is_empty() { ModulePath::from_dotted(&module_name, self.table) } else { default_name };
        let mut module = Module::new(module_id, module_name.clone(), module_path);

        // Pass 1: register every file and every top-level symbol so that
        // forward references within the module resolve regardless of file
        // order (`spec.md` §4.4 step 2).
        let mut pending_imports: Vec<(u32, Span, ModulePath, Option<crate::string_interning::StringId>)> = Vec::new();
        for (file_idx, file_path, parsed) in parsed_files {
            let display_path = display_path_for(&file_path, &self.config.entry);
            let mut source_file = SourceFile::new(module_id, file_idx, file_path.clone(), display_path);
            source_file.exprs = parsed.exprs;
            source_file.stmts = parsed.stmts;
            source_file.type_exprs = parsed.type_exprs;

            for import in &parsed.imports {
                let mod_path = ModulePath::from_components(import.path.clone());
                pending_imports.push((file_idx, import.span, mod_path, import.alias));
            }

            for (order, ast_decl) in parsed.decls.into_iter().enumerate() {
                let kind = decl_kind_tag(&ast_decl.kind);
                let name = ast_decl.name;
                let span = ast_decl.span;
                let exported = ast_decl.exported;
                let decl_index = module.unsorted_decls.len();
                let decl = Decl::new(file_idx, order, kind, ast_decl);
                module.unsorted_decls.push(decl);

                let flags = symbol_flags_for(kind, exported);
                let symbol = Symbol::new(module_id, name, span, flags, decl_index);
                if module.symbol_table.contains_key(&name) {
                    self.messages.push_error(CompileError::new(
                        ErrorKind::Resolution,
                        module_name.clone(),
                        source_file.display_path.clone(),
                        span,
                        format!("'{}' is already defined in this module", self.table.resolve(name)),
                    ));
                } else {
                    module.symbol_table.insert(name, symbol);
                }
            }

            module.files.push(source_file);
        }

        // Pass 2: resolve each file's import list against the dependency
        // table, recursing into the loader for each new path.
        for (file_idx, span, mod_path, alias) in pending_imports {
            let dep_index = module.dep_index_for(&mod_path);
            module.deps[dep_index].import_sites.push((file_idx, span));
            let alias_id = alias.unwrap_or_else(|| *mod_path.components().last().expect("non-empty import path"));
            if let Some(file) = module.files.iter_mut().find(|f| f.file_id == file_idx) {
                file.import_table.insert(alias_id, dep_index);
            }
        }

        self.by_path.insert(canonical.clone(), module_id);
        self.modules.push(module);

        for dep_index in 0..self.modules[module_id as usize].deps.len() {
            let mod_path = self.modules[module_id as usize].deps[dep_index].mod_path.clone();
            let resolved = mod_path.resolve_against_roots(&self.config.import_roots, self.table);
            let resolved_id = match resolved {
                Some(path) => self.load_module_at(path, mod_path.clone()),
                None => {
                    let sites = self.modules[module_id as usize].deps[dep_index].import_sites.clone();
                    for (file_id, span) in sites {
                        let display = self.modules[module_id as usize]
                            .files
                            .iter()
                            .find(|f| f.file_id == file_id)
                            .map(|f| f.display_path.clone())
                            .unwrap_or_default();
                        self.messages.push_error(CompileError::new(
                            ErrorKind::Module,
                            module_name.clone(),
                            display,
                            span,
                            format!("could not resolve import '{}'", mod_path.display_name(self.table)),
                        ));
                    }
                    None
                }
            };
            self.modules[module_id as usize].deps[dep_index].module_id = resolved_id;
        }

        // Implicit last dependency on the core module (`spec.md` §4.4
        // step 4), skipped when this module *is* the core module or no
        // core module was configured.
        if let Some(core_id) = self.core_module_id {
            if core_id != module_id {
                let module = &mut self.modules[module_id as usize];
                let core_path = ModulePath::single(self.table.intern(CORE_MODULE_NAME));
                if !module.deps.iter().any(|d| d.mod_path == core_path) {
                    let idx = module.dep_index_for(&core_path);
                    module.deps[idx].module_id = Some(core_id);
                    module.core_dep = Some(idx);
                }
            }
        }

        self.stack.pop();
        Some(module_id)
    }

    fn report_cycle(&mut self, pos_in_stack: usize, repeated: &Path) {
        let cycle_paths: Vec<PathBuf> = self.stack[pos_in_stack..].to_vec();
        let names: Vec<String> = cycle_paths
            .iter()
            .map(|p| module_stem(p))
            .chain(std::iter::once(module_stem(repeated)))
            .collect();
        let message = format!("import cycle detected: {}", names.join(" -> "));
        self.messages.push_error(CompileError::new(
            ErrorKind::Module,
            names[0].clone(),
            repeated.to_path_buf(),
            Span::default(),
            message,
        ));
    }
}

fn module_stem(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("module").to_string()
}

fn display_path_for(abs: &Path, entry: &Path) -> PathBuf {
    abs.strip_prefix(entry.parent().unwrap_or(Path::new("."))).unwrap_or(abs).to_path_buf()
}

/// `spec.md` §6: "a single file with extension `.bry` or a directory
/// containing a set of `.bry` files". Directory modules are not recursed
/// into subdirectories (open question #1 in `spec.md` §9, resolved
/// conservatively here).
fn collect_source_files(path: &Path) -> Result<Vec<PathBuf>, String> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)
            .map_err(|e| format!("could not read directory '{}': {e}", path.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(BRY_FILE_EXTENSION))
            .collect();
        if files.is_empty() {
            return Err(format!("directory module '{}' contains no .bry files", path.display()));
        }
        files.sort();
        return Ok(files);
    }
    Err(format!("module path '{}' does not exist", path.display()))
}

/// Computes a topological ordering of `modules` (leaves first) by DFS over
/// the dependency graph, matching `spec.md` §4.4 step 5 and the testable
/// property "for any module M with dependency D, index(D) < index(M)".
pub fn topological_order(modules: &[Module]) -> Vec<u32> {
    let mut order = Vec::with_capacity(modules.len());
    let mut visited = vec![false; modules.len()];
    let mut on_stack = vec![false; modules.len()];

    fn visit(id: u32, modules: &[Module], visited: &mut [bool], on_stack: &mut [bool], order: &mut Vec<u32>) {
        if visited[id as usize] || on_stack[id as usize] {
            return;
        }
        on_stack[id as usize] = true;
        for dep in &modules[id as usize].deps {
            if let Some(dep_id) = dep.module_id {
                visit(dep_id, modules, visited, on_stack, order);
            }
        }
        on_stack[id as usize] = false;
        visited[id as usize] = true;
        order.push(id);
    }

    for module in modules {
        visit(module.id, modules, &mut visited, &mut on_stack, &mut order);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{PlatformDescriptor, WordSize};
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_single_file_module() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_file(dir.path(), "main.bry", "func main(): i32 { return 0; }\n");
        let platform = PlatformDescriptor::new("linux", "x64", WordSize::Bits64);
        let config = Config::new(entry, platform);
        let mut table = StringTable::new();
        let mut messages = CompilerMessages::new();
        let mut loader = Loader::new(&config, &mut table, &mut messages);
        let root = loader.load_root();
        assert!(root.is_some());
        assert!(!messages.has_errors());
        let (modules, _) = loader.into_modules();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].unsorted_decls.len(), 1);
    }

    #[test]
    fn reports_missing_import() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_file(dir.path(), "main.bry", "import nothere;\nfunc main() {}\n");
        let platform = PlatformDescriptor::new("linux", "x64", WordSize::Bits64);
        let config = Config::new(entry, platform).with_import_roots(vec![dir.path().to_path_buf()]);
        let mut table = StringTable::new();
        let mut messages = CompilerMessages::new();
        let mut loader = Loader::new(&config, &mut table, &mut messages);
        loader.load_root();
        assert!(messages.has_errors());
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "leaf.bry", "pub func helper(): i32 { return 1; }\n");
        let entry = write_file(dir.path(), "main.bry", "import leaf;\nfunc main(): i32 { return leaf.helper(); }\n");
        let platform = PlatformDescriptor::new("linux", "x64", WordSize::Bits64);
        let config = Config::new(entry, platform).with_import_roots(vec![dir.path().to_path_buf()]);
        let mut table = StringTable::new();
        let mut messages = CompilerMessages::new();
        let mut loader = Loader::new(&config, &mut table, &mut messages);
        let root = loader.load_root().unwrap();
        assert!(!messages.has_errors());
        let (modules, _) = loader.into_modules();
        let order = topological_order(&modules);
        let leaf_pos = order.iter().position(|&id| id != root).unwrap();
        let root_pos = order.iter().position(|&id| id == root).unwrap();
        assert!(leaf_pos < root_pos);
    }
}
