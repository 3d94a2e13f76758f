//! Compile-time evaluation of checked HIR expressions (`spec.md` §4.8).
//!
//! Grounded on `examples/original_source/src/check/comptime_eval.cpp`'s
//! recursive tree-walking evaluator: numeric operators wrap at the operand's
//! bit width, division/modulo by zero and `MIN / -1` are comptime errors (not
//! panics), shift amounts are range-checked against the operand's bit size,
//! `&&`/`||` short-circuit without evaluating the unused side, and aggregate
//! indexing is bounds-checked before it touches `Vec::get`.

use super::{CResult, CheckAbort, Checker};
use crate::arena::Id;
use crate::ast::{BinOp, UnaryOp};
use crate::hir::{ConstValue, HirExpr, HirExprKind, ValueRef};
use crate::tokenizer::tokens::Span;
use crate::types::TypeKind;

impl<'a> Checker<'a> {
    /// Evaluates `id` to a [`ConstValue`], failing with [`CheckAbort`] (after
    /// reporting a comptime error) on anything that isn't actually
    /// foldable — a runtime-only value reference, an out-of-bounds index, a
    /// division by zero, and so on.
    pub(crate) fn eval_comptime(&mut self, id: Id<HirExpr>) -> CResult<ConstValue> {
        let expr = self.checked_mod.exprs.get(id).clone();
        match expr.kind {
            HirExprKind::Const(v) => Ok(v),
            HirExprKind::Value(ValueRef::Local(_)) => {
                self.comptime_error(expr.span, "a function parameter or local is not a compile-time constant".to_string());
                Err(CheckAbort)
            }
            HirExprKind::Value(ValueRef::Static { module_id, decl_index }) => self.eval_static_ref(module_id, decl_index, expr.span),
            HirExprKind::Field { base, index } => self.eval_field(base, index, expr.span),
            HirExprKind::ArrayLen(base) => self.eval_array_len_of(base, expr.span),
            HirExprKind::ArrayPtr(_) => {
                self.comptime_error(expr.span, "'_ptr' is not a compile-time constant".to_string());
                Err(CheckAbort)
            }
            HirExprKind::Index { base, index } => self.eval_index(base, index, expr.span),
            HirExprKind::Slice { base, lo, hi } => self.eval_slice(base, lo, hi, expr.span),
            HirExprKind::Call { .. } => {
                self.comptime_error(expr.span, "function calls are not compile-time constants".to_string());
                Err(CheckAbort)
            }
            HirExprKind::Unary(op, operand) => self.eval_unary(op, operand, expr.span),
            HirExprKind::Binary(op, lhs, rhs) => self.eval_binary(op, lhs, rhs, expr.span),
            HirExprKind::Cast { value, .. } => self.eval_cast(value, expr.ty, expr.span),
            HirExprKind::New { .. } => {
                self.comptime_error(expr.span, "'new' is not a compile-time constant".to_string());
                Err(CheckAbort)
            }
            HirExprKind::ArrayLit(elems) => self.eval_array_lit(&elems, expr.span),
            HirExprKind::StructLit(fields) => self.eval_struct_lit(&fields, expr.span),
        }
    }

    fn next_handle(&mut self) -> crate::hir::ConstHandle {
        let handle = self.next_const_handle;
        self.next_const_handle += 1;
        crate::hir::ConstHandle { module_id: self.module.id, handle }
    }

    fn eval_static_ref(&mut self, module_id: u32, decl_index: usize, span: Span) -> CResult<ConstValue> {
        let decl = if module_id == self.module.id {
            // `phase_a_types` checks every `GlobalConst` ahead of `phase_b`
            // (so a struct's array-length expression can read one), so a
            // same-module reference reaching here before `phase_b` has
            // pushed anything must look in `pending_const_decls` first.
            self.pending_const_decls
                .get(decl_index)
                .and_then(|d| d.clone())
                .or_else(|| self.checked_mod.decls.get(decl_index).cloned())
        } else {
            self.checked[module_id as usize].as_ref().and_then(|m| m.decls.get(decl_index).cloned())
        };
        match decl.map(|d| d.kind) {
            Some(crate::hir::HirDeclKind::GlobalConst { value }) => Ok(value),
            Some(crate::hir::HirDeclKind::Func { .. }) => Ok(ConstValue::FunctionPointer { module_id, decl_index }),
            Some(crate::hir::HirDeclKind::GlobalVar { .. }) => {
                self.comptime_error(span, "a mutable global is not a compile-time constant".to_string());
                Err(CheckAbort)
            }
            _ => {
                self.comptime_error(span, "reference does not name a compile-time constant".to_string());
                Err(CheckAbort)
            }
        }
    }

    fn eval_field(&mut self, base: Id<HirExpr>, index: usize, span: Span) -> CResult<ConstValue> {
        match self.eval_comptime(base)? {
            ConstValue::Struct { fields, .. } => {
                let found = fields.get(index).cloned();
                match found {
                    Some(v) => Ok(v),
                    None => {
                        self.comptime_error(span, "struct field index out of range".to_string());
                        Err(CheckAbort)
                    }
                }
            }
            _ => {
                self.comptime_error(span, "value has no fields at compile time".to_string());
                Err(CheckAbort)
            }
        }
    }

    fn eval_array_len_of(&mut self, base: Id<HirExpr>, span: Span) -> CResult<ConstValue> {
        match self.eval_comptime(base)? {
            ConstValue::Array { elems, .. } => Ok(ConstValue::U64(elems.len() as u64)),
            ConstValue::ZeroArray { len, .. } => Ok(ConstValue::U64(len)),
            ConstValue::String { value, .. } => Ok(ConstValue::U64(self.table.resolve(value).len() as u64)),
            _ => {
                self.comptime_error(span, "'_len' requires an array or string value".to_string());
                Err(CheckAbort)
            }
        }
    }

    fn eval_index(&mut self, base: Id<HirExpr>, index: Id<HirExpr>, span: Span) -> CResult<ConstValue> {
        let base_val = self.eval_comptime(base)?;
        let index_val = self.eval_comptime(index)?.as_i64().unwrap_or(-1);
        if index_val < 0 {
            self.comptime_error(span, "index is negative".to_string());
            return Err(CheckAbort);
        }
        let index_val = index_val as usize;
        match base_val {
            ConstValue::Array { elems, .. } => {
                let found = elems.get(index_val).cloned();
                match found {
                    Some(v) => Ok(v),
                    None => {
                        self.comptime_error(span, "index out of bounds".to_string());
                        Err(CheckAbort)
                    }
                }
            }
            ConstValue::ZeroArray { elem_ty, len, .. } => {
                if index_val as u64 >= len {
                    self.comptime_error(span, "index out of bounds".to_string());
                    return Err(CheckAbort);
                }
                Ok(self.zero_const_value(elem_ty))
            }
            ConstValue::String { value, .. } => {
                let found = self.table.resolve(value).as_bytes().get(index_val).copied();
                match found {
                    Some(b) => Ok(ConstValue::U8(b)),
                    None => {
                        self.comptime_error(span, "index out of bounds".to_string());
                        Err(CheckAbort)
                    }
                }
            }
            _ => {
                self.comptime_error(span, "value cannot be indexed at compile time".to_string());
                Err(CheckAbort)
            }
        }
    }

    fn eval_slice(&mut self, base: Id<HirExpr>, lo: Option<Id<HirExpr>>, hi: Option<Id<HirExpr>>, span: Span) -> CResult<ConstValue> {
        let base_val = self.eval_comptime(base)?;
        let lo = lo.map(|e| self.eval_comptime(e)).transpose()?.and_then(|v| v.as_i64()).unwrap_or(0).max(0) as usize;
        let handle = self.next_handle();
        match base_val {
            ConstValue::Array { elems, .. } => {
                let hi = match hi {
                    Some(e) => self.eval_comptime(e)?.as_i64().unwrap_or(elems.len() as i64).max(0) as usize,
                    None => elems.len(),
                };
                if lo > hi || hi > elems.len() {
                    self.comptime_error(span, "slice bounds out of range".to_string());
                    return Err(CheckAbort);
                }
                Ok(ConstValue::Array { elems: elems[lo..hi].to_vec(), handle })
            }
            ConstValue::String { value, .. } => {
                let text = self.table.resolve(value).to_string();
                let hi = match hi {
                    Some(e) => self.eval_comptime(e)?.as_i64().unwrap_or(text.len() as i64).max(0) as usize,
                    None => text.len(),
                };
                if lo > hi || hi > text.len() {
                    self.comptime_error(span, "slice bounds out of range".to_string());
                    return Err(CheckAbort);
                }
                let sliced = self.table.intern(&text[lo..hi]);
                Ok(ConstValue::String { value: sliced, handle })
            }
            _ => {
                self.comptime_error(span, "value cannot be sliced at compile time".to_string());
                Err(CheckAbort)
            }
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: Id<HirExpr>, span: Span) -> CResult<ConstValue> {
        let operand_ty = self.checked_mod.exprs.get(operand).ty;
        let val = self.eval_comptime(operand)?;
        match op {
            UnaryOp::Not => Ok(ConstValue::Bool(!val.as_bool().unwrap_or(false))),
            UnaryOp::Neg => {
                if let Some(f) = val.as_f64() {
                    return Ok(rewrap_float(-f, operand_ty, self));
                }
                let Some(i) = val.as_i64() else {
                    self.comptime_error(span, "'-' requires a numeric operand".to_string());
                    return Err(CheckAbort);
                };
                let bits = self.int_bits(operand_ty);
                if i == i64::MIN && bits >= 64 {
                    self.comptime_error(span, "negation overflow".to_string());
                    return Err(CheckAbort);
                }
                Ok(rewrap_int(i.wrapping_neg(), operand_ty, self))
            }
            UnaryOp::Deref | UnaryOp::AddressOf => {
                self.comptime_error(span, "pointer operations are not compile-time constants".to_string());
                Err(CheckAbort)
            }
        }
    }

    fn eval_binary(&mut self, op: BinOp, lhs: Id<HirExpr>, rhs: Id<HirExpr>, span: Span) -> CResult<ConstValue> {
        // Short-circuit before evaluating the right operand at all.
        if op == BinOp::And {
            let l = self.eval_comptime(lhs)?.as_bool().unwrap_or(false);
            if !l {
                return Ok(ConstValue::Bool(false));
            }
            let r = self.eval_comptime(rhs)?.as_bool().unwrap_or(false);
            return Ok(ConstValue::Bool(r));
        }
        if op == BinOp::Or {
            let l = self.eval_comptime(lhs)?.as_bool().unwrap_or(false);
            if l {
                return Ok(ConstValue::Bool(true));
            }
            let r = self.eval_comptime(rhs)?.as_bool().unwrap_or(false);
            return Ok(ConstValue::Bool(r));
        }

        let lhs_ty = self.checked_mod.exprs.get(lhs).ty;
        let l = self.eval_comptime(lhs)?;
        let r = self.eval_comptime(rhs)?;

        if let (Some(lf), Some(rf)) = (l.as_f64(), r.as_f64()) {
            return self.eval_float_binary(op, lf, rf, lhs_ty, span);
        }
        if let (Some(li), Some(ri)) = (l.as_i64(), r.as_i64()) {
            return self.eval_int_binary(op, li, ri, lhs_ty, span);
        }
        if let (Some(lb), Some(rb)) = (l.as_bool(), r.as_bool()) {
            return match op {
                BinOp::Eq => Ok(ConstValue::Bool(lb == rb)),
                BinOp::Ne => Ok(ConstValue::Bool(lb != rb)),
                _ => {
                    self.comptime_error(span, "operator does not apply to bool".to_string());
                    Err(CheckAbort)
                }
            };
        }
        self.comptime_error(span, "operands are not compile-time comparable/arithmetic values".to_string());
        Err(CheckAbort)
    }

    fn eval_float_binary(&mut self, op: BinOp, l: f64, r: f64, ty: Id<crate::types::Type>, span: Span) -> CResult<ConstValue> {
        let result = match op {
            BinOp::Add => l + r,
            BinOp::Sub => l - r,
            BinOp::Mul => l * r,
            BinOp::Div => {
                if r == 0.0 {
                    self.comptime_error(span, "division by zero".to_string());
                    return Err(CheckAbort);
                }
                l / r
            }
            BinOp::Eq => return Ok(ConstValue::Bool(l == r)),
            BinOp::Ne => return Ok(ConstValue::Bool(l != r)),
            BinOp::Lt => return Ok(ConstValue::Bool(l < r)),
            BinOp::Gt => return Ok(ConstValue::Bool(l > r)),
            BinOp::Le => return Ok(ConstValue::Bool(l <= r)),
            BinOp::Ge => return Ok(ConstValue::Bool(l >= r)),
            _ => {
                self.comptime_error(span, "operator does not apply to floating-point operands".to_string());
                return Err(CheckAbort);
            }
        };
        Ok(rewrap_float(result, ty, self))
    }

    fn eval_int_binary(&mut self, op: BinOp, l: i64, r: i64, ty: Id<crate::types::Type>, span: Span) -> CResult<ConstValue> {
        let bits = self.int_bits(ty);
        let result = match op {
            BinOp::Add => l.wrapping_add(r),
            BinOp::Sub => l.wrapping_sub(r),
            BinOp::Mul => l.wrapping_mul(r),
            BinOp::Div => {
                if r == 0 {
                    self.comptime_error(span, "division by zero".to_string());
                    return Err(CheckAbort);
                }
                if l == i64::MIN && r == -1 && bits >= 64 {
                    self.comptime_error(span, "division overflow".to_string());
                    return Err(CheckAbort);
                }
                l.wrapping_div(r)
            }
            BinOp::Mod => {
                if r == 0 {
                    self.comptime_error(span, "modulo by zero".to_string());
                    return Err(CheckAbort);
                }
                if l == i64::MIN && r == -1 && bits >= 64 {
                    self.comptime_error(span, "modulo overflow".to_string());
                    return Err(CheckAbort);
                }
                l.wrapping_rem(r)
            }
            BinOp::Shl => {
                if r < 0 || r as u32 >= bits as u32 {
                    self.comptime_error(span, "shift amount exceeds operand bit width".to_string());
                    return Err(CheckAbort);
                }
                l.wrapping_shl(r as u32)
            }
            BinOp::Shr => {
                if r < 0 || r as u32 >= bits as u32 {
                    self.comptime_error(span, "shift amount exceeds operand bit width".to_string());
                    return Err(CheckAbort);
                }
                l.wrapping_shr(r as u32)
            }
            BinOp::BitAnd => l & r,
            BinOp::BitOr => l | r,
            BinOp::BitXor => l ^ r,
            BinOp::Eq => return Ok(ConstValue::Bool(l == r)),
            BinOp::Ne => return Ok(ConstValue::Bool(l != r)),
            BinOp::Lt => return Ok(ConstValue::Bool(l < r)),
            BinOp::Gt => return Ok(ConstValue::Bool(l > r)),
            BinOp::Le => return Ok(ConstValue::Bool(l <= r)),
            BinOp::Ge => return Ok(ConstValue::Bool(l >= r)),
            BinOp::And | BinOp::Or => unreachable!("handled by short-circuit path above"),
        };
        Ok(rewrap_int(result, ty, self))
    }

    fn eval_cast(&mut self, value: Id<HirExpr>, dest: Id<crate::types::Type>, span: Span) -> CResult<ConstValue> {
        let src_ty = self.checked_mod.exprs.get(value).ty;
        let val = self.eval_comptime(value)?;
        let dest_resolved = self.tctx.full_unwrap(dest);
        match &self.tctx.get(dest_resolved).kind.clone() {
            TypeKind::Int { .. } => {
                let as_int = val.as_i64().or_else(|| val.as_f64().map(|f| f as i64)).unwrap_or(0);
                Ok(rewrap_int(as_int, dest, self))
            }
            TypeKind::Float { bits } => {
                let as_f = val.as_f64().or_else(|| val.as_i64().map(|i| i as f64)).unwrap_or(0.0);
                Ok(if *bits == 32 { ConstValue::F32(as_f as f32) } else { ConstValue::F64(as_f) })
            }
            TypeKind::Bool => Ok(ConstValue::Bool(val.as_i64().map(|i| i != 0).unwrap_or(false))),
            TypeKind::Enum { .. } => Ok(ConstValue::EnumTag(val.as_i64().unwrap_or(0) as u64)),
            _ => {
                let _ = src_ty;
                self.comptime_error(span, "this cast cannot be evaluated at compile time".to_string());
                Err(CheckAbort)
            }
        }
    }

    fn eval_array_lit(&mut self, elems: &[Id<HirExpr>], span: Span) -> CResult<ConstValue> {
        let _ = span;
        let mut out = Vec::with_capacity(elems.len());
        for &e in elems {
            out.push(self.eval_comptime(e)?);
        }
        let handle = self.next_handle();
        Ok(ConstValue::Array { elems: out, handle })
    }

    fn eval_struct_lit(&mut self, fields: &[Id<HirExpr>], span: Span) -> CResult<ConstValue> {
        let _ = span;
        let mut out = Vec::with_capacity(fields.len());
        for &f in fields {
            out.push(self.eval_comptime(f)?);
        }
        let handle = self.next_handle();
        Ok(ConstValue::Struct { fields: out, handle })
    }

    fn int_bits(&self, ty: Id<crate::types::Type>) -> u8 {
        let resolved = self.tctx.full_unwrap(ty);
        match self.tctx.get(resolved).kind {
            TypeKind::Int { bits, .. } => bits,
            _ => 64,
        }
    }

    /// The zero value of any fully-resolved type, used for uninitialized
    /// globals and for padding a struct literal's omitted fields (`spec.md`
    /// §4.7 point 6).
    pub(crate) fn zero_const_value(&mut self, ty: Id<crate::types::Type>) -> ConstValue {
        let resolved = self.tctx.full_unwrap(ty);
        match self.tctx.get(resolved).kind.clone() {
            TypeKind::Int { bits, signed } => zero_int(bits, signed),
            TypeKind::Float { bits } => if bits == 32 { ConstValue::F32(0.0) } else { ConstValue::F64(0.0) },
            TypeKind::Bool => ConstValue::Bool(false),
            TypeKind::Unit => ConstValue::Unit,
            TypeKind::String => {
                let empty = self.table.intern("");
                ConstValue::String { value: empty, handle: self.next_handle() }
            }
            TypeKind::Pointer(_) => ConstValue::Pointer { target: Box::new(ConstValue::U64(0)), handle: self.next_handle() },
            TypeKind::Function { .. } => ConstValue::FunctionPointer { module_id: u32::MAX, decl_index: 0 },
            TypeKind::Array { elem, len } => ConstValue::ZeroArray { elem_ty: elem, len, handle: self.next_handle() },
            TypeKind::Slice(_) => ConstValue::ZeroArray { elem_ty: self.primitives.unit, len: 0, handle: self.next_handle() },
            TypeKind::Struct { fields, .. } => {
                let field_tys: Vec<_> = fields.iter().map(|f| f.ty).collect();
                let values = field_tys.into_iter().map(|t| self.zero_const_value(t)).collect();
                ConstValue::Struct { fields: values, handle: self.next_handle() }
            }
            TypeKind::Enum { .. } => ConstValue::EnumTag(0),
            TypeKind::Named { inner, .. } => self.zero_const_value(inner),
            TypeKind::Alias(inner) => self.zero_const_value(inner),
            TypeKind::Untyped { .. } => ConstValue::I64(0),
        }
    }
}

fn zero_int(bits: u8, signed: bool) -> ConstValue {
    match (bits, signed) {
        (8, true) => ConstValue::I8(0),
        (8, false) => ConstValue::U8(0),
        (16, true) => ConstValue::I16(0),
        (16, false) => ConstValue::U16(0),
        (32, true) => ConstValue::I32(0),
        (32, false) => ConstValue::U32(0),
        (_, true) => ConstValue::I64(0),
        (_, false) => ConstValue::U64(0),
    }
}

/// Narrows a computed `i64` back into the `ConstValue` variant matching
/// `ty`'s concrete bit width, wrapping per `spec.md` §4.8.
fn rewrap_int(value: i64, ty: Id<crate::types::Type>, checker: &Checker) -> ConstValue {
    let resolved = checker.tctx.full_unwrap(ty);
    match checker.tctx.get(resolved).kind {
        TypeKind::Int { bits: 8, signed: true } => ConstValue::I8(value as i8),
        TypeKind::Int { bits: 8, signed: false } => ConstValue::U8(value as u8),
        TypeKind::Int { bits: 16, signed: true } => ConstValue::I16(value as i16),
        TypeKind::Int { bits: 16, signed: false } => ConstValue::U16(value as u16),
        TypeKind::Int { bits: 32, signed: true } => ConstValue::I32(value as i32),
        TypeKind::Int { bits: 32, signed: false } => ConstValue::U32(value as u32),
        TypeKind::Int { signed: true, .. } => ConstValue::I64(value),
        TypeKind::Int { signed: false, .. } => ConstValue::U64(value as u64),
        _ => ConstValue::I64(value),
    }
}

fn rewrap_float(value: f64, ty: Id<crate::types::Type>, checker: &Checker) -> ConstValue {
    let resolved = checker.tctx.full_unwrap(ty);
    match checker.tctx.get(resolved).kind {
        TypeKind::Float { bits: 32 } => ConstValue::F32(value as f32),
        _ => ConstValue::F64(value),
    }
}
