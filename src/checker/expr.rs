//! Expression checking: HIR construction, implicit casts, and alloc-mode
//! computation (`spec.md` §4.7 points 3-5).
//!
//! Grounded on `examples/original_source/src/check/check_expr.cpp`, whose
//! per-`ExprKind` dispatch this mirrors one arm at a time. Deeply nested
//! sub-expressions never abort the whole declaration on a resolution
//! failure — a failed operand is replaced with a `Const(Unit)` placeholder
//! (`check_sub`) so the surrounding expression still produces *some* HIR and
//! checking can continue on to the next statement or sibling declaration.
//! Only the outermost identifier/field lookup of a `check_expr` call
//! propagates `CheckAbort`, matching the existing `eval_array_len` caller in
//! `mod.rs`.

use super::{CResult, CheckAbort, Checker, NameBinding};
use crate::arena::Id;
use crate::ast::{Expr, ExprKind, StructLitField, UnaryOp};
use crate::hir::{AllocMode, ConstValue, HirExpr, HirExprKind, ValueRef};
use crate::tokenizer::tokens::{NumberBase, Span};
use crate::types::{Type, TypeConvResult, TypeKind, UntypedKind};

impl<'a> Checker<'a> {
    /// A cheap stand-in for a sub-expression whose own checking failed, so
    /// the enclosing expression keeps a structurally complete HIR tree.
    pub(crate) fn placeholder_expr(&mut self, span: Span) -> Id<HirExpr> {
        self.checked_mod.exprs.alloc(HirExpr {
            kind: HirExprKind::Const(ConstValue::Unit),
            ty: self.primitives.unit,
            assignable: false,
            alloc_mode: None,
            span,
        })
    }

    pub(crate) fn expr_span(&self, id: Id<Expr>) -> Span {
        self.module.files[self.current_file as usize].exprs.get(id).span
    }

    /// Checks a sub-expression that shouldn't be allowed to abort its
    /// parent; failures fall back to [`Self::placeholder_expr`].
    pub(crate) fn check_sub(&mut self, id: Id<Expr>, expected: Option<Id<Type>>) -> Id<HirExpr> {
        let span = self.expr_span(id);
        self.check_expr(id, expected).unwrap_or_else(|_| self.placeholder_expr(span))
    }

    /// Checks `id` against an optional expected type, producing a fully
    /// bound `HirExpr`. Only fails (propagating [`CheckAbort`]) when the
    /// expression is itself an unresolved identifier or module field —
    /// every nested operand failure is absorbed locally.
    pub(crate) fn check_expr(&mut self, id: Id<Expr>, expected: Option<Id<Type>>) -> CResult<Id<HirExpr>> {
        let node = self.module.files[self.current_file as usize].exprs.get(id).clone();
        let span = node.span;

        let hir_id = match node.kind {
            ExprKind::Ident(name) => return self.check_ident(name, span),
            ExprKind::IntLit { text, base } => self.check_int_lit(text, base, expected, span),
            ExprKind::FloatLit(text) => self.check_float_lit(text, expected, span),
            ExprKind::BoolLit(b) => self.checked_mod.exprs.alloc(HirExpr {
                kind: HirExprKind::Const(ConstValue::Bool(b)),
                ty: self.primitives.bool_,
                assignable: false,
                alloc_mode: None,
                span,
            }),
            ExprKind::StringLit(text) => {
                let handle = self.next_const_handle();
                self.checked_mod.exprs.alloc(HirExpr {
                    kind: HirExprKind::Const(ConstValue::String { value: text, handle }),
                    ty: self.primitives.string,
                    assignable: false,
                    alloc_mode: Some(AllocMode::Global),
                    span,
                })
            }
            ExprKind::RuneLit(code) => self.checked_mod.exprs.alloc(HirExpr {
                kind: HirExprKind::Const(ConstValue::I32(code)),
                ty: self.primitives.i32,
                assignable: false,
                alloc_mode: None,
                span,
            }),
            ExprKind::Null => {
                let untyped = self.new_untyped(UntypedKind::Null);
                let ty = match expected {
                    Some(want) => {
                        self.must_equal(span, untyped, want);
                        want
                    }
                    None => untyped,
                };
                self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Const(ConstValue::Pointer { target: Box::new(ConstValue::U64(0)), handle: self.next_const_handle() }), ty, assignable: false, alloc_mode: None, span })
            }
            ExprKind::Paren(inner) => return self.check_expr(inner, expected),
            ExprKind::Array(elems) => self.check_array_lit(&elems, expected, span),
            ExprKind::New { ty, size } => self.check_new(ty, size, span),
            ExprKind::StructLit { ty, fields } => self.check_struct_lit(ty, &fields, span),
            ExprKind::Field(base, name) => return self.check_field(base, name, span),
            ExprKind::Index(base, index) => self.check_index(base, index, span),
            ExprKind::Slice { base, lo, hi } => self.check_slice(base, lo, hi, span),
            ExprKind::Call { callee, args } => self.check_call(callee, &args, span),
            ExprKind::Unary(op, operand) => self.check_unary(op, operand, span),
            ExprKind::Binary(op, lhs, rhs) => self.check_binary(op, lhs, rhs, span),
            ExprKind::Cast { value, ty } => self.check_cast(value, ty, span),
            ExprKind::Sizeof(ty) => self.check_sizeof(ty, span),
            ExprKind::Alignof(ty) => self.check_alignof(ty, span),
        };
        Ok(hir_id)
    }

    fn next_const_handle(&mut self) -> crate::hir::ConstHandle {
        let handle = self.next_const_handle;
        self.next_const_handle += 1;
        crate::hir::ConstHandle { module_id: self.module.id, handle }
    }

    fn check_ident(&mut self, name: crate::string_interning::StringId, span: Span) -> CResult<Id<HirExpr>> {
        match self.resolve_name(name, span)? {
            NameBinding::Local(b) => Ok(self.checked_mod.exprs.alloc(HirExpr {
                kind: HirExprKind::Value(ValueRef::Local(b.id)),
                ty: b.ty,
                assignable: !b.immutable,
                alloc_mode: None,
                span,
            })),
            NameBinding::Import(_) => {
                self.error(span, "cannot use an imported module as a value".to_string());
                Err(CheckAbort)
            }
            NameBinding::Symbol { module_id, decl_index, ty, immutable, is_type, .. } => {
                if is_type {
                    self.error(span, format!("'{}' is a type, not a value", self.table.resolve(name)));
                    return Err(CheckAbort);
                }
                Ok(self.checked_mod.exprs.alloc(HirExpr {
                    kind: HirExprKind::Value(ValueRef::Static { module_id, decl_index }),
                    ty,
                    assignable: !immutable,
                    alloc_mode: None,
                    span,
                }))
            }
        }
    }

    fn check_int_lit(&mut self, text: crate::string_interning::StringId, base: NumberBase, expected: Option<Id<Type>>, span: Span) -> Id<HirExpr> {
        let raw = self.table.resolve(text);
        let value = parse_int_literal(raw, base);
        let untyped = self.new_untyped(UntypedKind::Int);
        let ty = match expected {
            Some(want) => {
                self.must_equal(span, untyped, want);
                want
            }
            None => untyped,
        };
        self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Const(ConstValue::I64(value)), ty, assignable: false, alloc_mode: None, span })
    }

    fn check_float_lit(&mut self, text: crate::string_interning::StringId, expected: Option<Id<Type>>, span: Span) -> Id<HirExpr> {
        let raw = self.table.resolve(text).replace('_', "");
        let value: f64 = raw.parse().unwrap_or(0.0);
        let untyped = self.new_untyped(UntypedKind::Float);
        let ty = match expected {
            Some(want) => {
                self.must_equal(span, untyped, want);
                want
            }
            None => untyped,
        };
        self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Const(ConstValue::F64(value)), ty, assignable: false, alloc_mode: None, span })
    }

    fn check_array_lit(&mut self, elems: &[Id<Expr>], expected: Option<Id<Type>>, span: Span) -> Id<HirExpr> {
        let elem_expected = expected.and_then(|want| match &self.tctx.get(self.tctx.inner(want)).kind {
            TypeKind::Array { elem, .. } | TypeKind::Slice(elem) => Some(*elem),
            _ => None,
        });
        let mut hir_elems = Vec::with_capacity(elems.len());
        let mut elem_ty = elem_expected;
        for &e in elems {
            let hir_e = self.check_sub(e, elem_ty);
            if elem_ty.is_none() {
                elem_ty = Some(self.checked_mod.exprs.get(hir_e).ty);
            }
            hir_elems.push(hir_e);
        }
        let elem_ty = elem_ty.unwrap_or(self.primitives.unit);
        let ty = self.tctx.alloc(TypeKind::Array { elem: elem_ty, len: hir_elems.len() as u64 });
        let alloc_mode = self.current_alloc_mode();
        self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::ArrayLit(hir_elems), ty, assignable: false, alloc_mode: Some(alloc_mode), span })
    }

    fn check_new(&mut self, ty: Id<crate::ast::TypeExpr>, size: Option<Id<Expr>>, span: Span) -> Id<HirExpr> {
        let elem_ty = self.resolve_type_expr(ty);
        let (result_ty, size_hir) = match size {
            Some(s) => {
                let size_hir = self.check_sub(s, Some(self.primitives.platform_uint));
                let slice_ty = self.tctx.alloc(TypeKind::Slice(elem_ty));
                (slice_ty, Some(size_hir))
            }
            None => {
                let ptr_ty = self.tctx.alloc(TypeKind::Pointer(elem_ty));
                (ptr_ty, None)
            }
        };
        // `new` always heap-allocates, regardless of the enclosing
        // function's default stack placement (`spec.md` §4.7 point 4).
        self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::New { size: size_hir }, ty: result_ty, assignable: false, alloc_mode: Some(AllocMode::Heap), span })
    }

    fn check_struct_lit(&mut self, ty: Id<crate::ast::TypeExpr>, fields: &[StructLitField], span: Span) -> Id<HirExpr> {
        let struct_ty = self.resolve_type_expr(ty);
        let resolved = self.tctx.full_unwrap(struct_ty);
        let (field_defs, ): (Vec<(crate::string_interning::StringId, Id<Type>)>, ) = match &self.tctx.get(resolved).kind {
            TypeKind::Struct { fields, .. } => (fields.iter().map(|f| (f.name, f.ty)).collect(),),
            _ => {
                self.type_error(span, format!("'{}' is not a struct type", self.type_name(struct_ty)));
                (Vec::new(),)
            }
        };

        let mut slots: Vec<Option<Id<HirExpr>>> = vec![None; field_defs.len()];
        for (positional_index, field) in fields.iter().enumerate() {
            match field.name {
                Some(name) => {
                    if let Some(slot) = field_defs.iter().position(|(n, _)| *n == name) {
                        let want = field_defs[slot].1;
                        slots[slot] = Some(self.check_sub(field.value, Some(want)));
                    } else {
                        self.error(span, format!("no field named '{}' on this struct", self.table.resolve(name)));
                        let _ = self.check_sub(field.value, None);
                    }
                }
                None => {
                    if let Some(want) = field_defs.get(positional_index).map(|(_, t)| *t) {
                        slots[positional_index] = Some(self.check_sub(field.value, Some(want)));
                    } else {
                        self.error(span, "too many positional initializers for this struct".to_string());
                        let _ = self.check_sub(field.value, None);
                    }
                }
            }
        }
        let hir_fields: Vec<Id<HirExpr>> = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.unwrap_or_else(|| {
                let ty = field_defs.get(i).map(|(_, t)| *t).unwrap_or(self.primitives.unit);
                let zero = self.zero_const_value(ty);
                self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Const(zero), ty, assignable: false, alloc_mode: None, span })
            }))
            .collect();

        let alloc_mode = self.current_alloc_mode();
        self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::StructLit(hir_fields), ty: struct_ty, assignable: false, alloc_mode: Some(alloc_mode), span })
    }

    fn check_field(&mut self, base: Id<Expr>, name: crate::string_interning::StringId, span: Span) -> CResult<Id<HirExpr>> {
        // `mod.symbol` — the base names an imported module, not a value.
        if let ExprKind::Ident(base_name) = self.module.files[self.current_file as usize].exprs.get(base).clone().kind {
            if let Some(&dep_index) = self.module.files[self.current_file as usize].import_table.get(&base_name) {
                return match self.resolve_module_field(dep_index, name, span)? {
                    NameBinding::Symbol { module_id, decl_index, ty, immutable, is_type, .. } => {
                        if is_type {
                            self.error(span, format!("'{}' is a type, not a value", self.table.resolve(name)));
                            return Err(CheckAbort);
                        }
                        Ok(self.checked_mod.exprs.alloc(HirExpr {
                            kind: HirExprKind::Value(ValueRef::Static { module_id, decl_index }),
                            ty,
                            assignable: !immutable,
                            alloc_mode: None,
                            span,
                        }))
                    }
                    _ => unreachable!("resolve_module_field only ever returns Symbol"),
                };
            }

            // `EnumType.Variant` — the base names a local enum type, not a
            // value; select the variant's tag rather than erroring the way
            // a plain `check_ident` on a type name would (`spec.md` §8
            // scenario 5, §4.7 point 6's enum-variant literal patterns).
            if let Some(ty) = self.quiet_type_symbol(base_name) {
                return Ok(self.check_enum_variant_selector(ty, base_name, name, span));
            }
        }

        let base_hir = self.check_sub(base, None);
        let base_ty = self.checked_mod.exprs.get(base_hir).ty;
        let resolved = self.tctx.full_unwrap(base_ty);

        let field_name = self.table.resolve(name).to_string();
        match field_name.as_str() {
            "_len" if matches!(self.tctx.get(resolved).kind, TypeKind::Array { .. } | TypeKind::Slice(_) | TypeKind::String) => {
                Ok(self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::ArrayLen(base_hir), ty: self.primitives.platform_uint, assignable: false, alloc_mode: None, span }))
            }
            "_ptr" if matches!(self.tctx.get(resolved).kind, TypeKind::Array { .. } | TypeKind::Slice(_) | TypeKind::String) => {
                let elem_ty = match &self.tctx.get(resolved).kind {
                    TypeKind::Array { elem, .. } | TypeKind::Slice(elem) => *elem,
                    TypeKind::String => self.primitives.u8,
                    _ => unreachable!(),
                };
                let ptr_ty = self.tctx.alloc(TypeKind::Pointer(elem_ty));
                Ok(self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::ArrayPtr(base_hir), ty: ptr_ty, assignable: false, alloc_mode: None, span }))
            }
            _ => {
                let fields = match &self.tctx.get(resolved).kind {
                    TypeKind::Struct { fields, .. } => fields.clone(),
                    _ => {
                        self.type_error(span, format!("'{}' has no field '{}'", self.type_name(base_ty), field_name));
                        return Ok(self.placeholder_expr(span));
                    }
                };
                match fields.iter().position(|f| f.name == name) {
                    Some(index) => {
                        let field_ty = fields[index].ty;
                        let base_assignable = self.checked_mod.exprs.get(base_hir).assignable;
                        Ok(self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Field { base: base_hir, index }, ty: field_ty, assignable: base_assignable, alloc_mode: None, span }))
                    }
                    None => {
                        self.type_error(span, format!("no field named '{field_name}' on this struct"));
                        Ok(self.placeholder_expr(span))
                    }
                }
            }
        }
    }

    /// Resolves `EnumName.Variant` to the variant's numeric tag as a folded
    /// `HirExprKind::Const(ConstValue::EnumTag)` (`spec.md` §8 scenario 5:
    /// `enum E { A; B; C; } const T = E.B;` → `ConstValue::Enum(1)`).
    /// `enum_ty` is whatever `resolve_name` returned for the base
    /// identifier — an alias or named wrapper around the actual
    /// `TypeKind::Enum`, unwrapped here the same way any other type label is.
    fn check_enum_variant_selector(&mut self, enum_ty: Id<Type>, enum_name: crate::string_interning::StringId, variant: crate::string_interning::StringId, span: Span) -> Id<HirExpr> {
        let resolved = self.tctx.full_unwrap(enum_ty);
        let tag_map = match &self.tctx.get(resolved).kind {
            TypeKind::Enum { tag_map } => tag_map.clone(),
            _ => {
                self.error(span, format!("'{}' is a type, not a value", self.table.resolve(enum_name)));
                return self.placeholder_expr(span);
            }
        };
        match tag_map.get(&variant) {
            Some(&tag) => self.checked_mod.exprs.alloc(HirExpr {
                kind: HirExprKind::Const(ConstValue::EnumTag(tag)),
                ty: enum_ty,
                assignable: false,
                alloc_mode: None,
                span,
            }),
            None => {
                self.error(span, format!("'{}' has no variant named '{}'", self.table.resolve(enum_name), self.table.resolve(variant)));
                self.placeholder_expr(span)
            }
        }
    }

    fn check_index(&mut self, base: Id<Expr>, index: Id<Expr>, span: Span) -> Id<HirExpr> {
        let base_hir = self.check_sub(base, None);
        let base_ty = self.checked_mod.exprs.get(base_hir).ty;
        let resolved = self.tctx.full_unwrap(base_ty);
        let elem_ty = match &self.tctx.get(resolved).kind {
            TypeKind::Array { elem, .. } | TypeKind::Slice(elem) => *elem,
            TypeKind::String => self.primitives.u8,
            _ => {
                self.type_error(span, format!("'{}' cannot be indexed", self.type_name(base_ty)));
                self.primitives.unit
            }
        };
        let index_hir = self.check_sub(index, Some(self.primitives.platform_uint));
        let base_assignable = self.checked_mod.exprs.get(base_hir).assignable;
        self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Index { base: base_hir, index: index_hir }, ty: elem_ty, assignable: base_assignable, alloc_mode: None, span })
    }

    fn check_slice(&mut self, base: Id<Expr>, lo: Option<Id<Expr>>, hi: Option<Id<Expr>>, span: Span) -> Id<HirExpr> {
        let base_hir = self.check_sub(base, None);
        let base_ty = self.checked_mod.exprs.get(base_hir).ty;
        let resolved = self.tctx.full_unwrap(base_ty);
        let elem_ty = match &self.tctx.get(resolved).kind {
            TypeKind::Array { elem, .. } | TypeKind::Slice(elem) => *elem,
            TypeKind::String => {
                let lo_hir = lo.map(|e| self.check_sub(e, Some(self.primitives.platform_uint)));
                let hi_hir = hi.map(|e| self.check_sub(e, Some(self.primitives.platform_uint)));
                return self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Slice { base: base_hir, lo: lo_hir, hi: hi_hir }, ty: self.primitives.string, assignable: false, alloc_mode: None, span });
            }
            _ => {
                self.type_error(span, format!("'{}' cannot be sliced", self.type_name(base_ty)));
                self.primitives.unit
            }
        };
        let lo_hir = lo.map(|e| self.check_sub(e, Some(self.primitives.platform_uint)));
        let hi_hir = hi.map(|e| self.check_sub(e, Some(self.primitives.platform_uint)));
        let slice_ty = self.tctx.alloc(TypeKind::Slice(elem_ty));
        self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Slice { base: base_hir, lo: lo_hir, hi: hi_hir }, ty: slice_ty, assignable: false, alloc_mode: None, span })
    }

    fn check_call(&mut self, callee: Id<Expr>, args: &[Id<Expr>], span: Span) -> Id<HirExpr> {
        // `receiver.method(args...)` — looked up in the receiver type's
        // method table, with the receiver itself becoming the first
        // argument (`spec.md` §4.7 point 2, method bodies bind an implicit
        // `self`).
        if let ExprKind::Field(base, name) = self.module.files[self.current_file as usize].exprs.get(callee).clone().kind {
            let is_module_alias = if let ExprKind::Ident(base_name) = self.module.files[self.current_file as usize].exprs.get(base).clone().kind {
                self.module.files[self.current_file as usize].import_table.contains_key(&base_name)
            } else {
                false
            };
            if !is_module_alias {
                if let Some(hir) = self.try_check_method_call(base, name, args, span) {
                    return hir;
                }
            }
        }

        let callee_hir = self.check_sub(callee, None);
        let callee_ty = self.checked_mod.exprs.get(callee_hir).ty;
        let resolved = self.tctx.full_unwrap(callee_ty);
        let (param_tys, ret_ty) = match &self.tctx.get(resolved).kind {
            TypeKind::Function { params, ret } => (params.clone(), *ret),
            _ => {
                self.type_error(span, format!("'{}' is not callable", self.type_name(callee_ty)));
                (Vec::new(), self.primitives.unit)
            }
        };
        let hir_args = self.check_call_args(args, &param_tys, span);
        self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Call { callee: callee_hir, args: hir_args }, ty: ret_ty, assignable: false, alloc_mode: None, span })
    }

    fn try_check_method_call(&mut self, base: Id<Expr>, name: crate::string_interning::StringId, args: &[Id<Expr>], span: Span) -> Option<Id<HirExpr>> {
        let base_hir = self.check_sub(base, None);
        let base_ty = self.checked_mod.exprs.get(base_hir).ty;
        let named = self.tctx.inner(base_ty);
        let TypeKind::Named { inner, methods, .. } = self.tctx.get(named).kind.clone() else {
            return None;
        };
        let Some(method) = methods.get(&name).cloned() else {
            let _ = inner;
            return None;
        };
        let (mut param_tys, ret_ty) = match self.tctx.get(method.signature).kind.clone() {
            TypeKind::Function { params, ret } => (params, ret),
            _ => (Vec::new(), self.primitives.unit),
        };
        if !param_tys.is_empty() {
            param_tys.remove(0);
        }
        let mut hir_args = Vec::with_capacity(args.len() + 1);
        hir_args.push(base_hir);
        hir_args.extend(self.check_call_args(args, &param_tys, span));

        let callee_hir = self.checked_mod.exprs.alloc(HirExpr {
            kind: HirExprKind::Value(ValueRef::Static { module_id: method.parent_id, decl_index: method.decl_number as usize }),
            ty: method.signature,
            assignable: false,
            alloc_mode: None,
            span,
        });
        Some(self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Call { callee: callee_hir, args: hir_args }, ty: ret_ty, assignable: false, alloc_mode: None, span }))
    }

    fn check_call_args(&mut self, args: &[Id<Expr>], param_tys: &[Id<Type>], span: Span) -> Vec<Id<HirExpr>> {
        let _ = span;
        args.iter()
            .enumerate()
            .map(|(i, &a)| self.check_sub(a, param_tys.get(i).copied()))
            .collect()
    }

    fn check_unary(&mut self, op: UnaryOp, operand: Id<Expr>, span: Span) -> Id<HirExpr> {
        self.check_unary_op(op, operand, span)
    }

    fn check_binary(&mut self, op: crate::ast::BinOp, lhs: Id<Expr>, rhs: Id<Expr>, span: Span) -> Id<HirExpr> {
        self.check_binary_op(op, lhs, rhs, span)
    }

    fn check_cast(&mut self, value: Id<Expr>, ty: Id<crate::ast::TypeExpr>, span: Span) -> Id<HirExpr> {
        let dest = self.resolve_type_expr(ty);
        let value_hir = self.check_sub(value, None);
        let src = self.checked_mod.exprs.get(value_hir).ty;
        self.must_cast(span, src, dest);
        self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Cast { value: value_hir, implicit: false }, ty: dest, assignable: false, alloc_mode: None, span })
    }

    /// `#sizeof(T)` (`spec.md` §4.8): resolved against the `TargetPlatform`
    /// oracle and folded straight to a constant — there's no runtime
    /// component to preserve past this point, matching the original's
    /// `AST_SIZEOF` visitor, which also has nothing left to do once the
    /// type is resolved.
    fn check_sizeof(&mut self, ty: Id<crate::ast::TypeExpr>, span: Span) -> Id<HirExpr> {
        let resolved = self.resolve_type_expr(ty);
        let n = self.platform.sizeof(self.tctx, resolved);
        self.checked_mod.exprs.alloc(HirExpr {
            kind: HirExprKind::Const(ConstValue::U64(n)),
            ty: self.primitives.platform_uint,
            assignable: false,
            alloc_mode: None,
            span,
        })
    }

    /// `#alignof(T)`, same shape as [`Self::check_sizeof`].
    fn check_alignof(&mut self, ty: Id<crate::ast::TypeExpr>, span: Span) -> Id<HirExpr> {
        let resolved = self.resolve_type_expr(ty);
        let n = self.platform.alignof(self.tctx, resolved);
        self.checked_mod.exprs.alloc(HirExpr {
            kind: HirExprKind::Const(ConstValue::U64(n)),
            ty: self.primitives.platform_uint,
            assignable: false,
            alloc_mode: None,
            span,
        })
    }

    /// `spec.md` §4.7 point 4: stack inside a function body (the common
    /// case, since only `&`-of-local/`new` change this), global inside a
    /// global initializer, promoted to heap by `new` specifically (handled
    /// at its own call site, not here).
    pub(crate) fn current_alloc_mode(&self) -> AllocMode {
        if self.scopes.is_empty() {
            AllocMode::Global
        } else {
            AllocMode::Stack
        }
    }

    /// `&expr` requires `expr` to be addressable: a named local, a
    /// dereference, an index/slice, or a field projection of one of those
    /// (`spec.md` §4.7 point 4).
    pub(crate) fn is_addressable(&self, expr: Id<HirExpr>) -> bool {
        match &self.checked_mod.exprs.get(expr).kind {
            HirExprKind::Value(ValueRef::Local(_)) | HirExprKind::Value(ValueRef::Static { .. }) => true,
            HirExprKind::Unary(UnaryOp::Deref, _) => true,
            HirExprKind::Index { .. } | HirExprKind::Slice { .. } => true,
            HirExprKind::Field { base, .. } => self.is_addressable(*base),
            _ => false,
        }
    }
}

/// Parses an integer literal's already-lexed text (no sign, underscores
/// allowed as separators, `base` selects the digit radix for everything but
/// `Decimal`; the lexer strips the `0x`/`0b`/`0o` prefix into `base` itself
/// rather than leaving it in `text`).
fn parse_int_literal(text: &str, base: NumberBase) -> i64 {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let radix = match base {
        NumberBase::Binary => 2,
        NumberBase::Octal => 8,
        NumberBase::Decimal => 10,
        NumberBase::Hex => 16,
    };
    i64::from_str_radix(&cleaned, radix).unwrap_or_else(|_| u64::from_str_radix(&cleaned, radix).map(|v| v as i64).unwrap_or(0))
}
