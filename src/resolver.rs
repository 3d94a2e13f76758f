//! Orders a module's top-level declarations so every type/const decl
//! appears after the decls it depends on, detecting cycles along the way.
//!
//! Grounded on the same `DependencyTracker`-style three-color DFS the
//! teacher's `compiler_frontend::module_dependencies` uses for module
//! cycles (`GColor::{White,Grey,Black}`, already defined in `symbol.rs`),
//! applied here to type-label/initializer edges between declarations
//! within one module rather than import edges between modules.

use crate::ast::{DeclKind, TypeExprKind};
use crate::compiler_messages::compiler_errors::{CompileError, CompilerMessages, ErrorKind};
use crate::module::Module;
use crate::string_interning::{StringId, StringTable};
use crate::symbol::{DeclKindTag, GColor};
use crate::tokenizer::tokens::Span;
use std::path::PathBuf;

/// Why a DFS edge was followed, used only to classify a discovered cycle
/// (`spec.md` §4.5: "infinite type" / "initialization cycle" / "type
/// depends on constant").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    /// An array element type: expansion-sensitive, so always followed even
    /// when the referenced decl is a constant.
    Hard,
    /// Pointer/slice/function member types: presence of the name is
    /// enough, no expansion required.
    Soft,
    /// An enum variant initializer, or a global/const initializer
    /// expression referencing another decl.
    Initializer,
}

struct Resolver<'a> {
    module: &'a Module,
    table: &'a StringTable,
    messages: &'a mut CompilerMessages,
    /// decl-index -> color, indexed in lockstep with `module.unsorted_decls`.
    colors: Vec<GColor>,
    /// Accumulates the path of decl-indices currently on the DFS stack, so
    /// a grey-hit can slice out exactly the cycle.
    path: Vec<usize>,
    /// Parallel to `path`: which edge kind led to each step, so the cycle
    /// diagnosis can classify itself.
    path_edges: Vec<EdgeKind>,
    order: Vec<usize>,
    display_path: PathBuf,
}

/// Sorts `module.unsorted_decls` into dependency order, per `spec.md`
/// §4.5, writing the result into `module.sorted_decls` and rewriting every
/// `Symbol::decl_index` so it names a position in the new order (`spec.md`
/// §4.5: "decl-indices are rewritten in-place so that all downstream
/// components observe the final ordering"). On a cycle, one diagnostic is
/// pushed to `messages` per distinct cycle found and the offending decls
/// are placed in the order they were discovered (best-effort, checking
/// continues).
pub fn resolve_declarations(module: &mut Module, table: &StringTable, messages: &mut CompilerMessages) {
    let display_path = module.files.first().map(|f| f.display_path.clone()).unwrap_or_default();
    let decl_count = module.unsorted_decls.len();
    let participates: Vec<bool> = module.unsorted_decls.iter().map(|d| d.kind.participates_in_sort()).collect();

    // Scoped so the resolver's shared borrow of `module` ends before the
    // permutation is applied below.
    let perm = {
        let mut resolver = Resolver {
            module: &*module,
            table,
            messages,
            colors: vec![GColor::White; decl_count],
            path: Vec::new(),
            path_edges: Vec::new(),
            order: Vec::new(),
            display_path,
        };

        for index in 0..decl_count {
            if participates[index] && resolver.colors[index] == GColor::White {
                resolver.visit(index);
            }
        }

        // Variables and functions are appended as a block afterward, in
        // source order (`spec.md` §4.5).
        let mut perm = resolver.order;
        for index in 0..decl_count {
            if !participates[index] {
                perm.push(index);
            }
        }
        perm
    };

    let mut new_index_of = vec![0usize; decl_count];
    for (new_index, &old_index) in perm.iter().enumerate() {
        new_index_of[old_index] = new_index;
    }

    let sorted: Vec<crate::symbol::Decl> = perm.iter().map(|&i| module.unsorted_decls[i].clone()).collect();
    module.sorted_decls = sorted;
    for symbol in module.symbol_table.values_mut() {
        symbol.decl_index = new_index_of[symbol.decl_index];
    }
}

impl<'a> Resolver<'a> {
    fn visit(&mut self, index: usize) {
        self.colors[index] = GColor::Grey;
        self.path.push(index);

        for (target, edge) in self.edges_of(index) {
            match self.colors[target] {
                GColor::White => {
                    self.path_edges.push(edge);
                    self.visit(target);
                    self.path_edges.pop();
                }
                GColor::Grey => {
                    self.path_edges.push(edge);
                    self.report_cycle(target);
                    self.path_edges.pop();
                }
                GColor::Black => {}
            }
        }

        self.path.pop();
        self.colors[index] = GColor::Black;
        self.order.push(index);
    }

    /// Resolves a declaration to the set of other decl-indices its type
    /// labels/initializers reference, tagged by edge kind.
    fn edges_of(&self, index: usize) -> Vec<(usize, EdgeKind)> {
        let decl = &self.module.unsorted_decls[index];
        let file = &self.module.files[decl.file_id as usize];
        let mut edges = Vec::new();

        match &decl.ast.kind {
            DeclKind::Struct { fields } => {
                for field in fields {
                    self.collect_type_edges(file, field.ty, false, &mut edges);
                }
            }
            DeclKind::Alias { ty } => {
                self.collect_type_edges(file, *ty, false, &mut edges);
            }
            DeclKind::Enum { variants } => {
                for (_, init) in variants {
                    if let Some(expr) = init {
                        self.collect_expr_edges(file, *expr, &mut edges);
                    }
                }
            }
            DeclKind::Global { ty, value, .. } => {
                if let Some(ty) = ty {
                    self.collect_type_edges(file, *ty, false, &mut edges);
                }
                if let Some(value) = value {
                    self.collect_expr_edges(file, *value, &mut edges);
                }
            }
            // Functions/methods/factories don't participate in sorting
            // (`spec.md` §4.5), so they contribute no edges even though a
            // body might reference module-level decls.
            DeclKind::Func { .. } => {}
        }

        edges
    }

    fn collect_type_edges(
        &self,
        file: &crate::module::SourceFile,
        ty: crate::arena::Id<crate::ast::TypeExpr>,
        soft: bool,
        out: &mut Vec<(usize, EdgeKind)>,
    ) {
        let node = file.type_exprs.get(ty);
        match &node.kind {
            TypeExprKind::Name(name) => {
                if let Some(target) = self.local_decl_named(*name) {
                    out.push((target, if soft { EdgeKind::Soft } else { EdgeKind::Hard }));
                }
            }
            TypeExprKind::Path(_) => {
                // Resolves through another module's symbol table; cross-module
                // references cannot participate in this module's cycle.
            }
            TypeExprKind::Pointer(inner) => self.collect_type_edges(file, *inner, true, out),
            TypeExprKind::Slice(inner) => self.collect_type_edges(file, *inner, true, out),
            // Arrays are always a hard edge (`spec.md` §4.5): the element's
            // size matters regardless of how this array type itself was
            // reached. The length expression is expanded unconditionally
            // too, mirroring the original's `resolveTypeLabel` ("we always
            // have to expand array sizes even if should_expand == false"):
            // a `[N]T` field depends on whatever decl `N` names even when
            // the element type alone wouldn't have forced an edge.
            TypeExprKind::Array { elem, len } => {
                self.collect_type_edges(file, *elem, false, out);
                self.collect_expr_edges(file, *len, out);
            }
            TypeExprKind::Func { params, ret } => {
                for param in params {
                    self.collect_type_edges(file, *param, true, out);
                }
                if let Some(ret) = ret {
                    self.collect_type_edges(file, *ret, true, out);
                }
            }
        }
    }

    fn collect_expr_edges(
        &self,
        file: &crate::module::SourceFile,
        expr: crate::arena::Id<crate::ast::Expr>,
        out: &mut Vec<(usize, EdgeKind)>,
    ) {
        use crate::ast::ExprKind;
        let node = file.exprs.get(expr);
        match &node.kind {
            ExprKind::Ident(name) => {
                if let Some(target) = self.local_decl_named(*name) {
                    out.push((target, EdgeKind::Initializer));
                }
            }
            ExprKind::Paren(inner) | ExprKind::Unary(_, inner) => self.collect_expr_edges(file, *inner, out),
            ExprKind::Cast { value, ty } => {
                self.collect_expr_edges(file, *value, out);
                self.collect_type_edges(file, *ty, true, out);
            }
            ExprKind::Binary(_, lhs, rhs) => {
                self.collect_expr_edges(file, *lhs, out);
                self.collect_expr_edges(file, *rhs, out);
            }
            ExprKind::Array(elems) => {
                for elem in elems {
                    self.collect_expr_edges(file, *elem, out);
                }
            }
            ExprKind::New { ty, size } => {
                self.collect_type_edges(file, *ty, true, out);
                if let Some(size) = size {
                    self.collect_expr_edges(file, *size, out);
                }
            }
            ExprKind::StructLit { ty, fields } => {
                self.collect_type_edges(file, *ty, true, out);
                for field in fields {
                    self.collect_expr_edges(file, field.value, out);
                }
            }
            ExprKind::Field(base, _) => self.collect_expr_edges(file, *base, out),
            ExprKind::Index(base, index) => {
                self.collect_expr_edges(file, *base, out);
                self.collect_expr_edges(file, *index, out);
            }
            ExprKind::Slice { base, lo, hi } => {
                self.collect_expr_edges(file, *base, out);
                if let Some(lo) = lo {
                    self.collect_expr_edges(file, *lo, out);
                }
                if let Some(hi) = hi {
                    self.collect_expr_edges(file, *hi, out);
                }
            }
            ExprKind::Call { callee, args } => {
                self.collect_expr_edges(file, *callee, out);
                for arg in args {
                    self.collect_expr_edges(file, *arg, out);
                }
            }
            // `#sizeof(T)`/`#alignof(T)` only need T's layout, the same as a
            // `Cast`'s destination type: a soft edge, not a hard one.
            ExprKind::Sizeof(ty) | ExprKind::Alignof(ty) => {
                self.collect_type_edges(file, *ty, true, out);
            }
            ExprKind::IntLit { .. }
            | ExprKind::FloatLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::RuneLit(_)
            | ExprKind::Null => {}
        }
    }

    fn local_decl_named(&self, name: StringId) -> Option<usize> {
        self.module.symbol_table.get(&name).map(|s| s.decl_index)
    }

    /// Emits one diagnostic for the cycle ending back at `target`, choosing
    /// its category per `spec.md` §4.5:
    /// - any `Initializer` edge among decls that include a constant ⇒
    ///   *initialization cycle* if purely constant-driven, or *type depends
    ///   on constant* if a type-only decl also participates via a hard/soft
    ///   type edge;
    /// - otherwise, a pure type cycle is *infinite type*.
    fn report_cycle(&mut self, target: usize) {
        let start = self.path.iter().position(|&i| i == target).unwrap_or(0);
        let cycle_indices = &self.path[start..];
        let cycle_edges = &self.path_edges[start.min(self.path_edges.len())..];

        let has_const = cycle_indices.iter().any(|&i| self.module.unsorted_decls[i].kind == DeclKindTag::GlobalConst);
        let has_initializer_edge = cycle_edges.iter().any(|e| *e == EdgeKind::Initializer);
        let has_type_edge = cycle_edges.iter().any(|e| *e != EdgeKind::Initializer);

        let category = if has_const && has_type_edge && has_initializer_edge {
            "type depends on constant"
        } else if has_const || has_initializer_edge {
            "initialization cycle"
        } else {
            "infinite type"
        };

        let names: Vec<String> = cycle_indices
            .iter()
            .map(|&i| self.module.unsorted_decls[i].ast.name)
            .chain(std::iter::once(self.module.unsorted_decls[target].ast.name))
            .map(|id| self.table.resolve(id).to_string())
            .collect();

        let span = cycle_indices.first().map(|&i| self.module.unsorted_decls[i].ast.span).unwrap_or(Span::default());
        self.messages.push_error(CompileError::new(
            ErrorKind::Resolution,
            self.module.name.clone(),
            self.display_path.clone(),
            span,
            format!("{category}: cycle through {}", names.join(" -> ")),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler_messages::compiler_errors::CompilerMessages;
    use crate::loader::Loader;
    use crate::settings::Config;
    use crate::string_interning::StringTable;
    use crate::target::{PlatformDescriptor, WordSize};
    use std::io::Write;

    fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn load_single(source: &str) -> (Module, StringTable, CompilerMessages) {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_file(dir.path(), "main.bry", source);
        let platform = PlatformDescriptor::new("linux", "x64", WordSize::Bits64);
        let config = Config::new(entry, platform);
        let mut table = StringTable::new();
        let mut messages = CompilerMessages::new();
        let mut loader = Loader::new(&config, &mut table, &mut messages);
        loader.load_root();
        let (mut modules, _) = loader.into_modules();
        (modules.remove(0), table, messages)
    }

    #[test]
    fn independent_structs_keep_source_order() {
        let (mut module, table, mut messages) = load_single("struct A { x: i32 }\nstruct B { y: i32 }\n");
        assert!(!messages.has_errors());
        resolve_declarations(&mut module, &table, &mut messages);
        assert_eq!(module.sorted_decls.len(), 2);
    }

    #[test]
    fn forward_referenced_struct_field_reorders() {
        let (mut module, mut table, mut messages) = load_single("struct A { b: B }\nstruct B { x: i32 }\n");
        assert!(!messages.has_errors());
        resolve_declarations(&mut module, &table, &mut messages);
        let names: Vec<&str> = module.sorted_decls.iter().map(|d| table.resolve(d.ast.name)).collect();
        let b_pos = names.iter().position(|&n| n == "B").unwrap();
        let a_pos = names.iter().position(|&n| n == "A").unwrap();
        assert!(b_pos < a_pos);

        // decl_index on every symbol must track the new order exactly.
        let a_sym_name = table.intern("A");
        let a_symbol = module.symbol_table.get(&a_sym_name).unwrap();
        assert_eq!(a_symbol.decl_index, a_pos);
    }

    #[test]
    fn self_referential_pointer_is_not_a_cycle() {
        // `struct Node { next: *Node }` is a soft edge (pointer), so it must
        // not be reported as an infinite-type cycle.
        let (mut module, table, mut messages) = load_single("struct Node { next: *Node }\n");
        assert!(!messages.has_errors());
        resolve_declarations(&mut module, &table, &mut messages);
        assert!(!messages.has_errors());
    }

    #[test]
    fn mutually_recursive_array_fields_report_infinite_type() {
        let (mut module, table, mut messages) = load_single("struct A { b: [2]B }\nstruct B { a: [2]A }\n");
        assert!(!messages.has_errors());
        resolve_declarations(&mut module, &table, &mut messages);
        assert!(messages.has_errors());
        assert!(messages.errors[0].message.contains("infinite type"));
    }
}
