//! Match pattern checking: literal patterns, bind patterns, and the
//! alternated-pattern/exhaustiveness rules of `spec.md` §4.7.
//!
//! Grounded on `examples/original_source/src/check/check_pattern.cpp`.
//! Alternated patterns (`p1 | p2`) must not bind a name — there would be no
//! single consistent local to bind across alternatives — so a `Bind` inside
//! an alternation of more than one pattern is diagnosed and turned into a
//! wildcard-like literal placeholder instead of silently picking one arm's
//! binding.

use super::Checker;
use crate::ast::{MatchArm, Pattern, PatternKind};
use crate::arena::Id;
use crate::hir::{HirMatchArm, HirPattern};
use crate::types::{Type, TypeKind};

impl<'a> Checker<'a> {
    /// Checks one `MatchArm` against the scrutinee's type, returning its HIR
    /// form. `exhaustive_tags` collects enum tags covered by a literal
    /// pattern so `check_match`'s caller can compute exhaustiveness.
    pub(crate) fn check_match_arm(&mut self, arm: &MatchArm, scrutinee_ty: Id<Type>, covered_tags: &mut Vec<u64>) -> HirMatchArm {
        let alternated = arm.patterns.len() > 1;
        self.push_scope();
        let patterns = arm
            .patterns
            .iter()
            .map(|p| self.check_pattern(p, scrutinee_ty, alternated, covered_tags))
            .collect();
        let body = self.check_stmt(arm.body);
        self.pop_scope();
        HirMatchArm { patterns, body }
    }

    fn check_pattern(&mut self, pattern: &Pattern, scrutinee_ty: Id<Type>, alternated: bool, covered_tags: &mut Vec<u64>) -> HirPattern {
        match &pattern.kind {
            PatternKind::Bind(name) => {
                if alternated {
                    self.error(pattern.span, "an alternated pattern must not bind a name".to_string());
                    return HirPattern::Literal(crate::hir::ConstValue::Unit);
                }
                HirPattern::Bind(self.declare_local(*name, scrutinee_ty, true, pattern.span))
            }
            PatternKind::Literal(expr) => {
                let hir = self.check_sub(*expr, Some(scrutinee_ty));
                let value = match self.eval_comptime(hir) {
                    Ok(v) => v,
                    Err(_) => crate::hir::ConstValue::Unit,
                };
                if let crate::hir::ConstValue::EnumTag(tag) = value {
                    covered_tags.push(tag);
                }
                HirPattern::Literal(value)
            }
        }
    }

    /// Whether every variant of `scrutinee_ty` (an enum) is covered by a
    /// literal pattern tag, used to set `HirStmtKind::Match::exhaustive`.
    pub(crate) fn enum_is_exhaustively_covered(&self, scrutinee_ty: Id<Type>, covered_tags: &[u64]) -> bool {
        let resolved = self.tctx.full_unwrap(scrutinee_ty);
        match &self.tctx.get(resolved).kind {
            TypeKind::Enum { tag_map } => tag_map.values().all(|tag| covered_tags.contains(tag)),
            // Non-enum scrutinees (ints, bools, strings) have no closed
            // variant set; `match` never claims exhaustiveness for them.
            _ => false,
        }
    }
}
