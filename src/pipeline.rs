//! The driver-facing entry point: one method per pipeline phase, so a
//! driver can instrument, parallelize, or halt between phases instead of
//! calling a single opaque `compile()`.
//!
//! Grounded on the teacher's `compiler_frontend::CompilerFrontend<'a>`
//! (`project_config`/`string_table` fields, one `pub fn` per phase named
//! after what it does — `source_to_tokens`, `tokens_to_headers`, ...): this
//! struct keeps the same shape, with phases renamed to the ones this
//! frontend actually has (`tokens_to_ast` rather than `tokens_to_headers`,
//! since there is no separate header-parsing pass here; `load_modules`,
//! `sort_declarations`, `check_module`, `evaluate_comptime` in place of the
//! teacher's HIR-lowering/codegen phases, out of scope for this port).

use crate::ast::ParsedFile;
use crate::checker::Checker;
use crate::compiler_messages::compiler_errors::CompilerMessages;
use crate::hir::{CheckedModule, GlobalInit, HirDeclKind};
use crate::loader::Loader;
use crate::module::Module;
use crate::module_path::ModulePath;
use crate::resolver::resolve_declarations;
use crate::settings::Config;
use crate::string_interning::StringTable;
use crate::tokenizer::tokens::{FileTokens, Token};
use crate::types::{Primitives, TypeContext};
use rayon::prelude::*;
use std::path::PathBuf;

/// Counts of how many of a module's global initializers folded to a
/// compile-time constant versus stayed a runtime expression (`spec.md`
/// §4.8 folds constants inline as each declaration is checked; a `const`
/// global that fails to fold is already an error raised during checking,
/// a `var` global with a non-constant initializer is expected).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComptimeSummary {
    pub folded: usize,
    pub residual: usize,
}

impl ComptimeSummary {
    fn add(self, other: ComptimeSummary) -> ComptimeSummary {
        ComptimeSummary { folded: self.folded + other.folded, residual: self.residual + other.residual }
    }
}

/// Owns the state a compile session shares across phases: the driver's
/// `Config` and the single `StringTable` every interned identifier in the
/// session must share.
pub struct Pipeline {
    pub config: Config,
    pub table: StringTable,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config, table: StringTable::new() }
    }

    /// -----------------------------
    /// TOKENIZER
    /// -----------------------------
    pub fn source_to_tokens(&mut self, source: &str) -> Result<Vec<Token>, crate::tokenizer::LexError> {
        crate::tokenizer::lex_source(source, &mut self.table)
    }

    /// -----------------------------
    /// PARSER
    /// -----------------------------
    /// Parses one file's tokens into an AST, threading diagnostics into
    /// `messages` rather than returning a `Result`, matching `Parser`'s own
    /// error-recovery contract (a parse always produces *a* tree, possibly
    /// with error nodes, so later phases still run).
    pub fn tokens_to_ast(&mut self, tokens: Vec<Token>, display_path: PathBuf, module_name: String, messages: &mut CompilerMessages) -> ParsedFile {
        let file_tokens = FileTokens::new(ModulePath::new(), tokens);
        let parser = crate::ast::Parser::new(file_tokens, &mut self.table, &self.config.platform, display_path, module_name, messages);
        parser.parse_file()
    }

    /// -----------------------------
    /// MODULE LOADING
    /// -----------------------------
    /// Loads the configured entry point and every module it transitively
    /// imports (`spec.md` §4.4). Returns the loaded modules in load order
    /// plus the root module's id, if loading succeeded.
    pub fn load_modules(&mut self, messages: &mut CompilerMessages) -> (Vec<Module>, Option<u32>) {
        let mut loader = Loader::new(&self.config, &mut self.table, messages);
        let root = loader.load_root();
        let (modules, _core) = loader.into_modules();
        (modules, root)
    }

    /// -----------------------------
    /// DECLARATION ORDERING
    /// -----------------------------
    /// Sorts every module's declarations into dependency order in place
    /// (`spec.md` §4.5). Each module's sort only consults its own
    /// `unsorted_decls`, so the order modules are visited in here doesn't
    /// matter.
    pub fn sort_declarations(&self, modules: &mut [Module], messages: &mut CompilerMessages) {
        for module in modules.iter_mut() {
            resolve_declarations(module, &self.table, messages);
        }
    }

    /// -----------------------------
    /// CHECKING
    /// -----------------------------
    /// Checks a single module, given every other module (so cross-module
    /// symbol lookups resolve) and the `CheckedModule`s already produced
    /// for modules earlier in topological order.
    pub fn check_module(
        &mut self,
        module: &mut Module,
        modules: &[Module],
        checked: &[Option<CheckedModule>],
        tctx: &mut TypeContext,
        primitives: &Primitives,
        messages: &mut CompilerMessages,
    ) -> CheckedModule {
        let checker = Checker::new(module, modules, checked, &mut self.table, tctx, primitives, &self.config.platform, messages);
        checker.check_module()
    }

    /// Checks every module in `modules`, in the dependency order
    /// `crate::loader::topological_order` computes, so a module is always
    /// checked after every module it imports (`spec.md` §4.4: "a
    /// dependency's symbols are always already typed" by the time a
    /// dependent module is checked). `CheckedModule`s from earlier modules
    /// are threaded forward so a later module's comptime evaluator can read
    /// an already-folded constant across a module boundary
    /// ([`crate::checker`]'s `comptime` pass indexes `checked` directly).
    ///
    /// Single-threaded: `Checker` borrows one module exclusively and every
    /// module (including that same one) read-only at once, so two modules
    /// can't safely be checked concurrently without either `unsafe` code or
    /// giving `Checker` interior mutability it doesn't otherwise need. The
    /// `[AMBIENT]` parallel path this crate's stack (`rayon`) would enable
    /// is left for a future pass over `Checker`'s borrow shape rather than
    /// implemented unsoundly here; see `DESIGN.md`.
    pub fn check_all_modules(&mut self, modules: &mut [Module], tctx: &mut TypeContext, primitives: &Primitives, messages: &mut CompilerMessages) -> Vec<Option<CheckedModule>> {
        let order = crate::loader::topological_order(modules);
        let mut checked: Vec<Option<CheckedModule>> = (0..modules.len()).map(|_| None).collect();
        for module_id in order {
            let mut module = std::mem::replace(&mut modules[module_id as usize], placeholder_module());
            let checked_mod = self.check_module(&mut module, modules, &checked, tctx, primitives, messages);
            modules[module_id as usize] = module;
            checked[module_id as usize] = Some(checked_mod);
        }
        checked
    }

    /// -----------------------------
    /// COMPTIME EVALUATION
    /// -----------------------------
    /// Summarizes how many of `checked`'s global initializers folded to a
    /// compile-time constant, so a driver has a single place to ask "is
    /// this module fully constant-folded" without re-walking every
    /// declaration itself.
    pub fn evaluate_comptime(&self, checked: &CheckedModule) -> ComptimeSummary {
        checked.decls.iter().fold(ComptimeSummary::default(), |acc, decl| acc.add(summarize_decl(decl)))
    }

    /// The same summary across every already-checked module, reduced in
    /// parallel: purely read-only over independent `CheckedModule`s, so
    /// unlike whole-module checking this has no cross-module aliasing
    /// concern (`spec.md` §5's `[AMBIENT]` rayon-backed path, realized
    /// here instead of in `check_all_modules`).
    pub fn evaluate_comptime_all(&self, checked: &[Option<CheckedModule>]) -> ComptimeSummary {
        checked
            .par_iter()
            .map(|m| m.as_ref().map(|m| self.evaluate_comptime(m)).unwrap_or_default())
            .reduce(ComptimeSummary::default, ComptimeSummary::add)
    }
}

fn summarize_decl(decl: &crate::hir::HirDecl) -> ComptimeSummary {
    match &decl.kind {
        HirDeclKind::GlobalConst { .. } => ComptimeSummary { folded: 1, residual: 0 },
        HirDeclKind::GlobalVar { init: GlobalInit::Const(_) } => ComptimeSummary { folded: 1, residual: 0 },
        HirDeclKind::GlobalVar { init: GlobalInit::Expr(_) } => ComptimeSummary { folded: 0, residual: 1 },
        HirDeclKind::Func { .. } | HirDeclKind::TypeOnly => ComptimeSummary::default(),
    }
}

fn placeholder_module() -> Module {
    Module::new(u32::MAX, String::new(), ModulePath::new())
}
