//! Modules, source files, and dependency entries.
//!
//! Grounded on `examples/original_source/include/symbol.hpp`'s `Module`,
//! `Module::DepEntry`, and `SourceFile`, translated to owned `Vec`s/`String`s
//! and an `FxHashMap` symbol table (the original's `unordered_map` keyed by
//! `string_view`) rather than raw-pointer back-references — a module owns
//! its files and symbols outright; downstream phases borrow from it.

use crate::arena::Arena;
use crate::ast::{Expr, ImportDecl, Stmt, TypeExpr};
use crate::module_path::ModulePath;
use crate::string_interning::StringId;
use crate::symbol::{Decl, Symbol};
use crate::tokenizer::tokens::Span;
use rustc_hash::FxHashMap;
use std::path::PathBuf;

/// A module's record of another module it imports (`spec.md` §3,
/// "Dependency entry"). `module_id` is `None` until the loader resolves it.
#[derive(Debug, Clone)]
pub struct DepEntry {
    pub module_id: Option<u32>,
    pub mod_path: ModulePath,
    /// Decl-indices of exported symbols actually used through this
    /// dependency, for cross-module reachability.
    pub usages: std::collections::HashSet<usize>,
    /// `(file_id, span)` of every import site of this dependency, for
    /// diagnostics (a cycle report names all of them).
    pub import_sites: Vec<(u32, Span)>,
}

impl DepEntry {
    pub fn new(mod_path: ModulePath) -> Self {
        Self {
            module_id: None,
            mod_path,
            usages: std::collections::HashSet::new(),
            import_sites: Vec::new(),
        }
    }
}

/// A single source file within a module (`spec.md` §3, "Source file").
///
/// Carries its own AST node arenas (`spec.md` §3, Lifecycles: "Parser arena
/// holds AST and token strings ... released only after the backend consumes
/// the HIR") so the checker can dereference `Id<Expr>`/`Id<TypeExpr>` handles
/// embedded in this file's declarations for as long as checking runs.
#[derive(Debug)]
pub struct SourceFile {
    pub parent_module_id: u32,
    pub file_id: u32,
    pub abs_path: PathBuf,
    pub display_path: PathBuf,
    /// Local import alias -> index into the owning module's `deps`.
    pub import_table: FxHashMap<StringId, usize>,
    pub exprs: Arena<Expr>,
    pub stmts: Arena<Stmt>,
    pub type_exprs: Arena<TypeExpr>,
}

impl SourceFile {
    pub fn new(parent_module_id: u32, file_id: u32, abs_path: PathBuf, display_path: PathBuf) -> Self {
        Self {
            parent_module_id,
            file_id,
            abs_path,
            display_path,
            import_table: FxHashMap::default(),
            exprs: Arena::new(),
            stmts: Arena::new(),
            type_exprs: Arena::new(),
        }
    }
}

/// A loaded module: identity, files, symbol table, declaration lists
/// (unsorted in source order, sorted once the resolver runs), and
/// dependency entries. Grounded on `symbol.hpp`'s `Module`.
#[derive(Debug)]
pub struct Module {
    pub id: u32,
    pub name: String,
    pub path: ModulePath,
    pub files: Vec<SourceFile>,
    pub symbol_table: FxHashMap<StringId, Symbol>,
    pub unsorted_decls: Vec<Decl>,
    pub sorted_decls: Vec<Decl>,
    pub deps: Vec<DepEntry>,
    /// Index into `deps` of the implicit core-module dependency, if one was
    /// added (`spec.md` §4.4, step 4).
    pub core_dep: Option<usize>,
}

impl Module {
    pub fn new(id: u32, name: String, path: ModulePath) -> Self {
        Self {
            id,
            name,
            path,
            files: Vec::new(),
            symbol_table: FxHashMap::default(),
            unsorted_decls: Vec::new(),
            sorted_decls: Vec::new(),
            deps: Vec::new(),
            core_dep: None,
        }
    }

    /// Finds or creates a `DepEntry` for `path`, returning its index.
    pub fn dep_index_for(&mut self, path: &ModulePath) -> usize {
        if let Some(idx) = self.deps.iter().position(|d| &d.mod_path == path) {
            return idx;
        }
        self.deps.push(DepEntry::new(path.clone()));
        self.deps.len() - 1
    }

    pub fn record_import_site(&mut self, dep_index: usize, file_id: u32, span: Span, import: &ImportDecl) {
        let _ = import;
        self.deps[dep_index].import_sites.push((file_id, span));
    }
}
