//! Attribute legality and the three-pass declaration-checking driver.
//!
//! Grounded on `examples/original_source/src/check/check_attrs.cpp` (the
//! `@extern`/`@abientry`/`@callconv`/`@inline` legality table). The
//! `phase_a_types`/`phase_a_signatures`/`phase_b` split itself isn't a port of
//! anything in the original: `check_decl.cpp`'s `checkDecl` is a single
//! switch over every declaration kind with `// TODO` stubs for most of them,
//! not a multi-pass driver. The split here is this port's own addition,
//! needed so forward references between sibling declarations (a struct field
//! naming a type declared later in the file, a global const read by an
//! earlier sibling's array length) resolve without a dedicated
//! name-resolution pre-pass.

use super::Checker;
use crate::arena::Id;
use crate::ast::{Attribute, DeclKind as AstDeclKind};
use crate::hir::{GlobalInit, HirDecl, HirDeclKind};
use crate::symbol::{Decl, DeclKindTag};
use crate::types::{FactoryFunc, Method, StructField, Type, TypeKind};
use rustc_hash::FxHashMap;

/// Which declaration shape `check_attrs` is validating against, since the
/// legality rules differ for functions, globals, and bare type declarations.
pub(crate) enum AttrContext {
    Function { has_body: bool },
    GlobalVar { has_value: bool },
    GlobalConst,
    TypeDecl,
}

/// The attributes recognized by name, folded out of the raw `Attribute`
/// list once validated (`spec.md` §4.7 point 8). `callconv` stays `None`
/// unless both present and legal.
#[derive(Debug, Clone, Default)]
pub(crate) struct AttrInfo {
    pub is_extern: bool,
    pub is_abientry: bool,
    pub is_inline: bool,
    pub callconv: Option<String>,
}

const KNOWN_CALLCONVS: [&str; 3] = ["c", "win64", "stdcall"];

pub(crate) fn check_attrs(checker: &mut Checker, attrs: &[Attribute], ctx: AttrContext) -> AttrInfo {
    let mut info = AttrInfo::default();

    for attr in attrs {
        let name = checker.table.resolve(attr.name).to_string();
        match name.as_str() {
            "extern" => info.is_extern = true,
            "abientry" => info.is_abientry = true,
            "inline" => info.is_inline = true,
            "callconv" => {
                let value = attr.value.map(|v| checker.table.resolve(v).to_string());
                match value.as_deref() {
                    Some(v) if KNOWN_CALLCONVS.contains(&v) => info.callconv = value,
                    Some(v) => checker.error(attr.value_span.unwrap_or(attr.name_span), format!("unknown calling convention '{v}'")),
                    None => checker.error(attr.name_span, "@callconv requires a convention name".to_string()),
                }
            }
            _ => checker.warn_unknown_attribute(attr.name_span, &name),
        }
    }

    let span = attrs.first().map(|a| a.name_span).unwrap_or_default();
    match ctx {
        AttrContext::Function { has_body } => {
            if info.is_extern && has_body {
                checker.error(span, "a function marked @extern must not have a body".to_string());
            }
            if !has_body && !info.is_extern && !info.is_abientry {
                checker.error(span, "a function with no body must be marked @extern or @abientry".to_string());
            }
            if info.is_extern && info.is_abientry {
                checker.error(span, "@extern and @abientry are mutually exclusive".to_string());
            }
            if info.is_extern && info.is_inline {
                checker.error(span, "@extern and @inline are mutually exclusive".to_string());
            }
            if info.callconv.is_some() && !info.is_extern {
                checker.error(span, "@callconv only applies to @extern functions".to_string());
            }
        }
        AttrContext::GlobalVar { has_value } => {
            if info.is_extern && has_value {
                checker.error(span, "a global marked @extern must not have an initializer".to_string());
            }
            if info.is_extern && info.is_abientry {
                checker.error(span, "@extern and @abientry are mutually exclusive".to_string());
            }
            if info.callconv.is_some() {
                checker.error(span, "@callconv only applies to functions".to_string());
            }
        }
        AttrContext::GlobalConst => {
            if info.is_abientry {
                checker.error(span, "@abientry cannot apply to a constant".to_string());
            }
            if info.callconv.is_some() {
                checker.error(span, "@callconv only applies to functions".to_string());
            }
        }
        AttrContext::TypeDecl => {}
    }

    info
}

impl<'a> Checker<'a> {
    /// Allocates a placeholder `Named` type for every struct/alias/enum
    /// declaration, then fills each one in, so a field or alias target that
    /// forward-references a sibling type (or itself, for a recursive
    /// `*Node`-shaped struct) resolves to a stable `Id<Type>` either way
    /// (`types::context::set_kind`'s doc comment).
    pub(crate) fn phase_a_types(&mut self) {
        let decl_count = self.module.sorted_decls.len();
        let mut placeholders: Vec<Option<Id<Type>>> = vec![None; decl_count];
        self.pending_const_decls = vec![None; decl_count];

        for index in 0..decl_count {
            let decl = &self.module.sorted_decls[index];
            if !matches!(decl.kind, DeclKindTag::Struct | DeclKindTag::Alias | DeclKindTag::Enum) {
                continue;
            }
            let name = decl.ast.name;
            let mod_id = self.module.id;
            let mod_name = self.table.intern(&self.module.name.clone());

            let inner = match decl.kind {
                DeclKindTag::Struct => self.tctx.alloc(TypeKind::Struct { fields: Vec::new(), name_map: FxHashMap::default() }),
                DeclKindTag::Alias => self.tctx.alloc(TypeKind::Alias(self.primitives.unit)),
                DeclKindTag::Enum => self.tctx.alloc(TypeKind::Enum { tag_map: FxHashMap::default() }),
                _ => unreachable!(),
            };
            let named = self.tctx.alloc(TypeKind::Named {
                mod_id,
                mod_name,
                name,
                inner,
                methods: FxHashMap::default(),
                factory: None,
            });
            placeholders[index] = Some(inner);
            if let Some(sym) = self.module.symbol_table.get_mut(&name) {
                sym.ty = Some(named);
            }
        }

        // Fills struct/alias/enum bodies *and* checks `const` initializers,
        // walking `sorted_decls` in its single topological order rather than
        // as two separate passes. The resolver (`spec.md` §4.5) guarantees
        // that order already accounts for both directions of dependency a
        // struct can have on a constant: a `const` a struct's array-length
        // expression names comes first (the hard edge `collect_type_edges`
        // now raises for `TypeExprKind::Array`'s `len`), and any constant
        // whose initializer builds a struct literal comes after that
        // struct's own (possibly still-placeholder) fields are in place.
        // Splitting type-filling from const-checking into separate passes
        // would run every struct's array-length evaluation before any
        // sibling constant had a value to report, silently folding such
        // lengths to 0 (`eval_array_len`'s error fallback) regardless of
        // what the resolver had already ordered.
        for index in 0..decl_count {
            let decl = self.module.sorted_decls[index].clone();
            self.current_file = decl.file_id;

            if decl.kind == DeclKindTag::GlobalConst {
                self.build_global_signature(&decl);
                let hir_decl = self.check_global_const_decl(&decl);
                self.pending_const_decls[index] = Some(hir_decl);
                continue;
            }

            let Some(inner) = placeholders[index] else { continue };
            match &decl.ast.kind {
                AstDeclKind::Struct { fields } => {
                    let mut out_fields = Vec::with_capacity(fields.len());
                    let mut name_map = FxHashMap::default();
                    for field in fields {
                        let ty = self.resolve_type_expr(field.ty);
                        name_map.insert(field.name, out_fields.len());
                        out_fields.push(StructField { name: field.name, ty, exported: field.exported });
                    }
                    self.tctx.set_kind(inner, TypeKind::Struct { fields: out_fields, name_map });
                }
                AstDeclKind::Alias { ty } => {
                    let resolved = self.resolve_type_expr(*ty);
                    self.tctx.set_kind(inner, TypeKind::Alias(resolved));
                }
                AstDeclKind::Enum { variants } => {
                    let mut tag_map = FxHashMap::default();
                    let mut next_tag: u64 = 0;
                    for (variant_name, init) in variants {
                        let tag = match init {
                            Some(expr) => {
                                let tag = match self.check_expr(*expr, Some(self.primitives.i64)) {
                                    Ok(hir_id) => {
                                        self.finish_expr();
                                        match self.eval_comptime(hir_id) {
                                            Ok(v) => v.as_i64().unwrap_or(next_tag as i64).max(0) as u64,
                                            Err(_) => next_tag,
                                        }
                                    }
                                    Err(_) => next_tag,
                                };
                                tag
                            }
                            None => next_tag,
                        };
                        tag_map.insert(*variant_name, tag);
                        next_tag = tag + 1;
                    }
                    self.tctx.set_kind(inner, TypeKind::Enum { tag_map });
                }
                _ => unreachable!("placeholders is only populated for Struct/Alias/Enum"),
            }
        }
    }

    /// Resolves the signature (parameter/return types for funcs, the
    /// declared type for globals that wrote one) of every remaining
    /// declaration, so `phase_b` can check bodies in any order without
    /// forward-reference failures for calls/reads of sibling decls.
    pub(crate) fn phase_a_signatures(&mut self) {
        let decl_count = self.module.sorted_decls.len();
        for index in 0..decl_count {
            let decl = self.module.sorted_decls[index].clone();
            self.current_file = decl.file_id;
            match decl.kind {
                DeclKindTag::Func | DeclKindTag::Method | DeclKindTag::Factory => {
                    self.build_function_signature(&decl);
                }
                DeclKindTag::GlobalVar => {
                    self.build_global_signature(&decl);
                }
                // Already signatured and checked in `phase_a_types`, in
                // topological order alongside the struct/alias/enum fields
                // its initializer or a sibling's array length might depend
                // on.
                DeclKindTag::GlobalConst => {}
                DeclKindTag::Struct | DeclKindTag::Alias | DeclKindTag::Enum => {}
            }
        }
    }

    fn build_function_signature(&mut self, decl: &Decl) {
        let AstDeclKind::Func { receiver, factory_of, params, ret, .. } = &decl.ast.kind else {
            return;
        };
        let mut param_tys = Vec::new();
        if let Some(recv) = receiver {
            param_tys.push(self.resolve_type_expr(*recv));
        }
        for p in params {
            param_tys.push(self.resolve_type_expr(p.ty));
        }
        let ret_ty = match ret {
            Some(r) => self.resolve_type_expr(*r),
            None => match factory_of {
                Some(f) => self.resolve_type_expr(*f),
                None => self.primitives.unit,
            },
        };
        let func_ty = self.tctx.alloc(TypeKind::Function { params: param_tys, ret: ret_ty });
        if let Some(sym) = self.module.symbol_table.get_mut(&decl.ast.name) {
            sym.ty = Some(func_ty);
        }

        if decl.kind == DeclKindTag::Method {
            if let Some(recv) = receiver {
                let recv_ty = self.resolve_type_expr(*recv);
                self.register_method(recv_ty, decl, func_ty);
            }
        } else if decl.kind == DeclKindTag::Factory {
            if let Some(f) = factory_of {
                let owner_ty = self.resolve_type_expr(*f);
                self.register_factory(owner_ty, decl, func_ty);
            }
        }
    }

    /// Inserts a method into its receiver type's method table. A receiver
    /// that doesn't name a `Named` type (a primitive, say) is a resolution
    /// error rather than silently dropping the method.
    fn register_method(&mut self, named_ty: Id<Type>, decl: &Decl, signature: Id<Type>) {
        let kind = self.tctx.get(named_ty).kind.clone();
        let TypeKind::Named { mod_id, mod_name, name, inner, mut methods, factory } = kind else {
            self.error(decl.ast.span, "a method's receiver must name a struct type".to_string());
            return;
        };
        methods.insert(
            decl.ast.name,
            Method { parent_id: self.module.id, decl_number: decl.insertion_order as u32, name: decl.ast.name, signature, exported: decl.ast.exported },
        );
        self.tctx.set_kind(named_ty, TypeKind::Named { mod_id, mod_name, name, inner, methods, factory });
    }

    fn register_factory(&mut self, named_ty: Id<Type>, decl: &Decl, signature: Id<Type>) {
        let kind = self.tctx.get(named_ty).kind.clone();
        let TypeKind::Named { mod_id, mod_name, name, inner, methods, .. } = kind else {
            self.error(decl.ast.span, "a factory's owner must name a struct type".to_string());
            return;
        };
        let factory = Some(FactoryFunc { parent_id: self.module.id, decl_number: decl.insertion_order as u32, signature, exported: decl.ast.exported });
        self.tctx.set_kind(named_ty, TypeKind::Named { mod_id, mod_name, name, inner, methods, factory });
    }

    fn build_global_signature(&mut self, decl: &Decl) {
        let AstDeclKind::Global { ty, .. } = &decl.ast.kind else { return };
        if let Some(ty_expr) = ty {
            let resolved = self.resolve_type_expr(*ty_expr);
            if let Some(sym) = self.module.symbol_table.get_mut(&decl.ast.name) {
                sym.ty = Some(resolved);
            }
        }
        // No annotation: left unresolved until `phase_b` checks the
        // initializer and backfills `sym.ty` from its type.
    }

    /// Checks every declaration body in final (sorted) order and fills
    /// `checked_mod.decls`, one `HirDecl` per `sorted_decls` entry so the
    /// two arrays stay index-aligned (`spec.md` §6).
    pub(crate) fn phase_b(&mut self) {
        let decl_count = self.module.sorted_decls.len();
        for index in 0..decl_count {
            let decl = self.module.sorted_decls[index].clone();
            self.current_file = decl.file_id;
            self.unsafe_depth = 0;
            self.loop_depth = 0;
            self.match_depth = 0;
            self.enclosing_return_type = None;
            let hir_decl = match decl.kind {
                DeclKindTag::Func | DeclKindTag::Method | DeclKindTag::Factory => self.check_func_decl(&decl),
                DeclKindTag::GlobalVar => self.check_global_var_decl(&decl),
                // Checked early in `phase_a_types`; re-checking here would
                // both duplicate diagnostics and discard the value a
                // sibling's array length may already have read.
                DeclKindTag::GlobalConst => self.pending_const_decls[index]
                    .take()
                    .unwrap_or_else(|| self.check_global_const_decl(&decl)),
                DeclKindTag::Struct | DeclKindTag::Alias | DeclKindTag::Enum => self.check_type_only_decl(&decl),
            };
            self.checked_mod.decls.push(hir_decl);
        }
    }

    fn check_func_decl(&mut self, decl: &Decl) -> HirDecl {
        let AstDeclKind::Func { receiver, params, body, .. } = &decl.ast.kind else {
            unreachable!("DeclKindTag::Func/Method/Factory always carries DeclKind::Func")
        };
        let has_body = body.is_some();
        let attr_ctx = AttrContext::Function { has_body };
        self.check_attrs(&decl.attrs, attr_ctx);

        let sym_ty = self.module.symbol_table.get(&decl.ast.name).and_then(|s| s.ty).unwrap_or(self.primitives.unit);
        let (param_tys, ret_ty) = match self.tctx.get(sym_ty).kind.clone() {
            TypeKind::Function { params: p, ret } => (p, ret),
            _ => (Vec::new(), self.primitives.unit),
        };

        self.push_scope();
        self.is_comptime_expr = false;
        let mut local_ids = Vec::with_capacity(param_tys.len());
        let mut tys = param_tys.into_iter();
        if receiver.is_some() {
            if let Some(recv_ty) = tys.next() {
                let self_name = self.table.intern("self");
                local_ids.push(self.declare_local(self_name, recv_ty, false, decl.ast.span));
            }
        }
        for (param, ty) in params.iter().zip(tys) {
            local_ids.push(self.declare_local(param.name, ty, false, param.span));
        }

        self.enclosing_return_type = Some(ret_ty);
        let hir_body = body.map(|b| self.check_stmt(b));
        self.pop_scope();
        self.enclosing_return_type = None;

        HirDecl {
            name: decl.ast.name,
            kind: HirDeclKind::Func { params: local_ids, ret: ret_ty, body: hir_body },
            attrs: decl.ast.attrs.clone(),
            exported: decl.ast.exported,
            ty: sym_ty,
            span: decl.ast.span,
        }
    }

    fn check_global_var_decl(&mut self, decl: &Decl) -> HirDecl {
        let AstDeclKind::Global { ty, value, .. } = &decl.ast.kind else {
            unreachable!("DeclKindTag::GlobalVar always carries DeclKind::Global")
        };
        self.check_attrs(&decl.attrs, AttrContext::GlobalVar { has_value: value.is_some() });

        let declared_ty = self.module.symbol_table.get(&decl.ast.name).and_then(|s| s.ty);
        self.is_comptime_expr = true;
        let (final_ty, init) = match value {
            Some(expr) => {
                let hir_id = self.check_expr(*expr, declared_ty).unwrap_or_else(|_| self.placeholder_expr(decl.ast.span));
                let got_ty = self.checked_mod.exprs.get(hir_id).ty;
                let (final_ty, hir_id) = match declared_ty {
                    Some(want) => (want, self.coerce(decl.ast.span, hir_id, got_ty, want)),
                    None => {
                        self.tctx.infer_all(self.primitives);
                        let concrete = self.tctx.inner(got_ty);
                        (concrete, hir_id)
                    }
                };
                self.tctx.clear_untyped();
                let init = if self.is_comptime_expr {
                    match self.eval_comptime(hir_id) {
                        Ok(v) => GlobalInit::Const(v),
                        Err(_) => GlobalInit::Expr(hir_id),
                    }
                } else {
                    GlobalInit::Expr(hir_id)
                };
                (final_ty, init)
            }
            None => {
                let ty = declared_ty.unwrap_or(self.primitives.unit);
                (ty, GlobalInit::Const(self.zero_const_value(ty)))
            }
        };

        if let Some(sym) = self.module.symbol_table.get_mut(&decl.ast.name) {
            sym.ty = Some(final_ty);
        }

        HirDecl {
            name: decl.ast.name,
            kind: HirDeclKind::GlobalVar { init },
            attrs: decl.ast.attrs.clone(),
            exported: decl.ast.exported,
            ty: final_ty,
            span: decl.ast.span,
        }
    }

    fn check_global_const_decl(&mut self, decl: &Decl) -> HirDecl {
        let AstDeclKind::Global { value, .. } = &decl.ast.kind else {
            unreachable!("DeclKindTag::GlobalConst always carries DeclKind::Global")
        };
        self.check_attrs(&decl.attrs, AttrContext::GlobalConst);

        let declared_ty = self.module.symbol_table.get(&decl.ast.name).and_then(|s| s.ty);
        self.is_comptime_expr = true;
        let hir_id = match value {
            Some(expr) => self.check_expr(*expr, declared_ty).unwrap_or_else(|_| self.placeholder_expr(decl.ast.span)),
            None => {
                self.error(decl.ast.span, format!("'{}' is declared const but has no initializer", self.table.resolve(decl.ast.name)));
                self.placeholder_expr(decl.ast.span)
            }
        };
        let got_ty = self.checked_mod.exprs.get(hir_id).ty;
        let (final_ty, hir_id) = match declared_ty {
            Some(want) => (want, self.coerce(decl.ast.span, hir_id, got_ty, want)),
            None => {
                self.tctx.infer_all(self.primitives);
                let concrete = self.tctx.inner(got_ty);
                (concrete, hir_id)
            }
        };
        self.tctx.clear_untyped();

        if !self.is_comptime_expr {
            self.comptime_error(decl.ast.span, format!("'{}' is declared const but its initializer is not a compile-time constant", self.table.resolve(decl.ast.name)));
        }
        let value = self.eval_comptime(hir_id).unwrap_or(crate::hir::ConstValue::Unit);

        if let Some(sym) = self.module.symbol_table.get_mut(&decl.ast.name) {
            sym.ty = Some(final_ty);
        }

        HirDecl {
            name: decl.ast.name,
            kind: HirDeclKind::GlobalConst { value },
            attrs: decl.ast.attrs.clone(),
            exported: decl.ast.exported,
            ty: final_ty,
            span: decl.ast.span,
        }
    }

    fn check_type_only_decl(&mut self, decl: &Decl) -> HirDecl {
        self.check_attrs(&decl.attrs, AttrContext::TypeDecl);
        let ty = self.module.symbol_table.get(&decl.ast.name).and_then(|s| s.ty).unwrap_or(self.primitives.unit);
        HirDecl {
            name: decl.ast.name,
            kind: HirDeclKind::TypeOnly,
            attrs: decl.ast.attrs.clone(),
            exported: decl.ast.exported,
            ty,
            span: decl.ast.span,
        }
    }
}
