//! Unary/binary operator legality: which operand type combinations each
//! operator accepts and the result type it produces.
//!
//! Grounded on `examples/original_source/src/check/check_op.cpp`
//! (`mustApplyBinaryOp`/`mustApplyUnaryOp` and their `maybeApplyPtrArithOp`/
//! `maybeApplyPtrCompareOp` helpers). Pointer arithmetic and pointer/integer
//! comparisons are gated on `unsafe_depth > 0`; everything else only needs
//! both operands to agree on a type.

use super::Checker;
use crate::arena::Id;
use crate::ast::{BinOp, Expr, UnaryOp};
use crate::hir::{HirExpr, HirExprKind};
use crate::tokenizer::tokens::Span;
use crate::types::{Type, TypeKind};

impl<'a> Checker<'a> {
    pub(crate) fn check_unary_op(&mut self, op: UnaryOp, operand: Id<Expr>, span: Span) -> Id<HirExpr> {
        match op {
            UnaryOp::Deref => {
                let operand_hir = self.check_sub(operand, None);
                self.is_comptime_expr = false;
                let operand_ty = self.checked_mod.exprs.get(operand_hir).ty;
                let resolved = self.tctx.inner(operand_ty);
                let ty = match self.tctx.get(resolved).kind.clone() {
                    TypeKind::Pointer(inner) => inner,
                    _ => {
                        self.type_error(span, format!("cannot dereference '{}'", self.type_name(operand_ty)));
                        self.primitives.unit
                    }
                };
                self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Unary(op, operand_hir), ty, assignable: true, alloc_mode: None, span })
            }
            UnaryOp::AddressOf => {
                let operand_hir = self.check_sub(operand, None);
                self.is_comptime_expr = false;
                if !self.is_addressable(operand_hir) {
                    self.error(span, "cannot take the address of this expression".to_string());
                }
                let operand_ty = self.checked_mod.exprs.get(operand_hir).ty;
                let ty = self.tctx.alloc(TypeKind::Pointer(operand_ty));
                self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Unary(op, operand_hir), ty, assignable: false, alloc_mode: None, span })
            }
            UnaryOp::Not | UnaryOp::Neg => {
                let operand_hir = self.check_sub(operand, None);
                let operand_ty = self.checked_mod.exprs.get(operand_hir).ty;
                let ty = self.must_apply_unary_op(span, op, operand_ty);
                self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Unary(op, operand_hir), ty, assignable: false, alloc_mode: None, span })
            }
        }
    }

    pub(crate) fn check_binary_op(&mut self, op: BinOp, lhs: Id<Expr>, rhs: Id<Expr>, span: Span) -> Id<HirExpr> {
        let lhs_hir = self.check_sub(lhs, None);
        let rhs_hir = self.check_sub(rhs, None);
        let lhs_ty = self.checked_mod.exprs.get(lhs_hir).ty;
        let rhs_ty = self.checked_mod.exprs.get(rhs_hir).ty;
        let ty = self.must_apply_binary_op(span, op, lhs_ty, rhs_ty);
        self.checked_mod.exprs.alloc(HirExpr { kind: HirExprKind::Binary(op, lhs_hir, rhs_hir), ty, assignable: false, alloc_mode: None, span })
    }

    fn must_apply_unary_op(&mut self, span: Span, op: UnaryOp, operand_ty: Id<Type>) -> Id<Type> {
        self.tctx.infer_enabled = true;
        let operand_outer = operand_ty;
        let operand_ty = self.tctx.inner(operand_ty);

        let return_ty = match op {
            UnaryOp::Not => {
                if self.tctx.equal(operand_ty, self.primitives.bool_) {
                    Some(self.primitives.bool_)
                } else {
                    None
                }
            }
            UnaryOp::Neg => {
                if self.tctx.is_number_type(operand_ty) {
                    Some(operand_ty)
                } else {
                    None
                }
            }
            UnaryOp::Deref | UnaryOp::AddressOf => unreachable!("handled directly in check_unary_op"),
        };

        self.tctx.infer_enabled = false;
        match return_ty {
            Some(t) => t,
            None => {
                self.type_error(span, format!("cannot apply {} operator to {}", unary_op_str(op), self.type_name(operand_outer)));
                self.primitives.unit
            }
        }
    }

    /// Shared with compound assignment (`x += y`) in `stmt.rs`, which checks
    /// the combined operator the same way a plain `x + y` would be.
    pub(crate) fn must_apply_binary_op(&mut self, span: Span, op: BinOp, lhs_type: Id<Type>, rhs_type: Id<Type>) -> Id<Type> {
        self.tctx.infer_enabled = true;
        let lhs_outer = lhs_type;
        let rhs_outer = rhs_type;
        let lhs_type = self.tctx.inner(lhs_type);
        let rhs_type = self.tctx.inner(rhs_type);

        let return_ty = match op {
            BinOp::Sub | BinOp::Add => {
                let mut return_ty = None;
                if op == BinOp::Sub
                    && self.unsafe_depth > 0
                    && matches!(self.tctx.get(lhs_type).kind, TypeKind::Pointer(_))
                    && matches!(self.tctx.get(rhs_type).kind, TypeKind::Pointer(_))
                    && self.tctx.equal(lhs_type, rhs_type)
                {
                    return_ty = Some(self.primitives.platform_int);
                }
                if return_ty.is_none() && self.unsafe_depth > 0 {
                    return_ty = self.maybe_apply_ptr_arith_op(lhs_type, rhs_type);
                }
                if return_ty.is_none() && self.tctx.equal(lhs_type, rhs_type) && self.tctx.is_number_type(lhs_type) {
                    return_ty = Some(lhs_type);
                }
                return_ty
            }
            BinOp::Mul | BinOp::Div | BinOp::Mod => {
                if self.tctx.equal(lhs_type, rhs_type) && self.tctx.is_number_type(lhs_type) {
                    Some(lhs_type)
                } else {
                    None
                }
            }
            BinOp::Shl | BinOp::Shr => {
                let mut return_ty = None;
                if self.unsafe_depth > 0 && matches!(self.tctx.get(lhs_type).kind, TypeKind::Pointer(_)) && self.tctx.is_int_type(rhs_type) {
                    return_ty = Some(lhs_type);
                }
                if return_ty.is_none() && self.tctx.equal(lhs_type, rhs_type) && self.tctx.is_int_type(lhs_type) {
                    return_ty = Some(lhs_type);
                }
                return_ty
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                let mut return_ty = None;
                if self.unsafe_depth > 0 {
                    return_ty = self.maybe_apply_ptr_arith_op(lhs_type, rhs_type);
                }
                if return_ty.is_none() && self.tctx.equal(lhs_type, rhs_type) && self.tctx.is_int_type(lhs_type) {
                    return_ty = Some(lhs_type);
                }
                return_ty
            }
            BinOp::Eq | BinOp::Ne => {
                let uncomparable = match self.tctx.get(lhs_type).kind.clone() {
                    TypeKind::Slice(_) | TypeKind::Function { .. } | TypeKind::Struct { .. } => true,
                    TypeKind::Named { .. } => {
                        let unwrapped = self.tctx.full_unwrap(lhs_type);
                        matches!(self.tctx.get(unwrapped).kind, TypeKind::Struct { .. })
                    }
                    _ => false,
                };
                if uncomparable {
                    None
                } else if self.maybe_apply_ptr_compare_op(lhs_type, rhs_type).is_some() || self.tctx.equal(lhs_type, rhs_type) {
                    Some(self.primitives.bool_)
                } else {
                    None
                }
            }
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                if self.maybe_apply_ptr_compare_op(lhs_type, rhs_type).is_some() {
                    Some(self.primitives.bool_)
                } else if self.tctx.equal(lhs_type, rhs_type) && self.tctx.is_number_type(lhs_type) {
                    Some(self.primitives.bool_)
                } else {
                    None
                }
            }
            BinOp::And | BinOp::Or => {
                if self.tctx.equal(lhs_type, self.primitives.bool_) && self.tctx.equal(rhs_type, self.primitives.bool_) {
                    Some(self.primitives.bool_)
                } else {
                    None
                }
            }
        };

        self.tctx.infer_enabled = false;
        match return_ty {
            Some(t) => t,
            None => {
                self.type_error(span, format!("cannot apply {} operator to {} and {}", binary_op_str(op), self.type_name(lhs_outer), self.type_name(rhs_outer)));
                self.primitives.unit
            }
        }
    }

    /// Pointer `+`/`-`/bitwise an integer offset, either operand order.
    fn maybe_apply_ptr_arith_op(&mut self, lhs_type: Id<Type>, rhs_type: Id<Type>) -> Option<Id<Type>> {
        if matches!(self.tctx.get(lhs_type).kind, TypeKind::Pointer(_)) {
            if self.tctx.is_int_type(rhs_type) {
                return Some(lhs_type);
            }
        } else if matches!(self.tctx.get(rhs_type).kind, TypeKind::Pointer(_)) && self.tctx.is_int_type(lhs_type) {
            return Some(rhs_type);
        }
        None
    }

    /// Pointer compared against `null`, another pointer of the same type, or
    /// an integer address, either operand order.
    fn maybe_apply_ptr_compare_op(&mut self, lhs_type: Id<Type>, rhs_type: Id<Type>) -> Option<Id<Type>> {
        let lhs_is_ptr = matches!(self.tctx.get(lhs_type).kind, TypeKind::Pointer(_));
        let rhs_is_ptr = matches!(self.tctx.get(rhs_type).kind, TypeKind::Pointer(_));
        if lhs_is_ptr {
            if self.tctx.is_null_type(rhs_type) {
                self.tctx.equal(lhs_type, rhs_type);
                Some(lhs_type)
            } else if rhs_is_ptr {
                if self.tctx.equal(lhs_type, rhs_type) { Some(lhs_type) } else { None }
            } else if self.tctx.is_int_type(rhs_type) {
                Some(lhs_type)
            } else {
                None
            }
        } else if rhs_is_ptr {
            if self.tctx.is_null_type(lhs_type) {
                self.tctx.equal(lhs_type, rhs_type);
                Some(rhs_type)
            } else if self.tctx.is_int_type(lhs_type) {
                Some(rhs_type)
            } else {
                None
            }
        } else {
            None
        }
    }
}

fn unary_op_str(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Not => "!",
        UnaryOp::Deref => "*",
        UnaryOp::AddressOf => "&",
    }
}

fn binary_op_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Shl => "<<",
        BinOp::Shr => ">>",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::And => "&&",
        BinOp::Or => "||",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Gt => ">",
        BinOp::Le => "<=",
        BinOp::Ge => ">=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_op_str_covers_every_variant() {
        // Exercises the match arms for a representative sample; a missing
        // arm would fail to compile rather than panic at runtime.
        assert_eq!(binary_op_str(BinOp::Add), "+");
        assert_eq!(binary_op_str(BinOp::Ge), ">=");
        assert_eq!(unary_op_str(UnaryOp::AddressOf), "&");
    }
}
