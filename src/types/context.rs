//! Type allocation, inner-unwrapping, comparison, and the untyped-literal
//! union-find.
//!
//! Grounded on `examples/original_source/src/types/type_cmp.cpp` (equality/
//! subtype/cast matrices) and `src/types/untyped.cpp` (union-find over
//! untyped literals). The union-find here uses ordinary path compression and
//! union-by-rank rather than the original's erase-from-hashmap scheme, since
//! a plain `Vec`-backed table is both simpler and a closer fit for an arena
//! that never frees individual entries.

use crate::arena::{Arena, Id};
use crate::target::{TargetPlatform, WordSize};
use crate::types::{Primitives, Type, TypeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UntypedKind {
    Int,
    Float,
    Num,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeConvResult {
    Fail,
    Cast,
    Eq,
}

#[derive(Debug, Clone, Copy)]
struct UntypedEntry {
    kind: UntypedKind,
    concrete_type: Option<Id<Type>>,
}

/// Per-compilation (or per-module, under the optional parallel checking mode
/// — each worker gets its own context) type state: the arena every `Type` is
/// allocated from, plus the untyped-literal union-find used during
/// inference.
pub struct TypeContext {
    arena: Arena<Type>,

    /// Union-find parent array, one entry per untyped ever created. A root
    /// is its own parent.
    unt_parent: Vec<u32>,
    /// Union-find rank (tree height upper bound), parallel to `unt_parent`.
    unt_rank: Vec<u32>,
    /// Entry state, valid only when read through a root index (non-root
    /// slots are left stale after a union and are never consulted again).
    unt_entries: Vec<UntypedEntry>,

    /// `spec.md` §4.6: when set, `equal`/`subtype`/`cast` are allowed to
    /// narrow untyped inference state as a side effect, matching the
    /// teacher's `TC_INFER` flag semantics.
    pub infer_enabled: bool,
    /// `spec.md` §6: enables the relaxed conversions permitted inside
    /// `unsafe` blocks (pointer<->integer casts, enum<->integer casts).
    pub unsafe_enabled: bool,
}

impl TypeContext {
    /// Builds a fresh context along with its preallocated primitive types.
    pub fn new(platform: &dyn TargetPlatform) -> (Self, Primitives) {
        let mut ctx = Self {
            arena: Arena::new(),
            unt_parent: Vec::new(),
            unt_rank: Vec::new(),
            unt_entries: Vec::new(),
            infer_enabled: false,
            unsafe_enabled: false,
        };

        let i8 = ctx.alloc(TypeKind::Int { bits: 8, signed: true });
        let u8 = ctx.alloc(TypeKind::Int { bits: 8, signed: false });
        let i16 = ctx.alloc(TypeKind::Int { bits: 16, signed: true });
        let u16 = ctx.alloc(TypeKind::Int { bits: 16, signed: false });
        let i32 = ctx.alloc(TypeKind::Int { bits: 32, signed: true });
        let u32 = ctx.alloc(TypeKind::Int { bits: 32, signed: false });
        let i64 = ctx.alloc(TypeKind::Int { bits: 64, signed: true });
        let u64 = ctx.alloc(TypeKind::Int { bits: 64, signed: false });
        let f32 = ctx.alloc(TypeKind::Float { bits: 32 });
        let f64 = ctx.alloc(TypeKind::Float { bits: 64 });
        let bool_ = ctx.alloc(TypeKind::Bool);
        let unit = ctx.alloc(TypeKind::Unit);
        let string = ctx.alloc(TypeKind::String);
        let ptr_u8 = ctx.alloc(TypeKind::Pointer(u8));

        let word_bits = match platform.pointer_width() {
            WordSize::Bits32 => 32,
            WordSize::Bits64 => 64,
        };
        let platform_int = match word_bits {
            32 => i32,
            _ => i64,
        };
        let platform_uint = match word_bits {
            32 => u32,
            _ => u64,
        };

        let primitives = Primitives {
            i8,
            u8,
            i16,
            u16,
            i32,
            u32,
            i64,
            u64,
            f32,
            f64,
            bool_,
            unit,
            string,
            ptr_u8,
            platform_int,
            platform_uint,
        };

        (ctx, primitives)
    }

    pub fn alloc(&mut self, kind: TypeKind) -> Id<Type> {
        self.arena.alloc(Type::new(kind))
    }

    pub fn get(&self, id: Id<Type>) -> &Type {
        self.arena.get(id)
    }

    /// Overwrites the kind of an already-allocated type in place, keeping
    /// its `Id<Type>` stable. Used by the checker's two-pass declaration
    /// strategy: a placeholder struct/alias/enum is allocated before its
    /// body is checked so forward/self-referential type labels within the
    /// same module resolve to a real `Id<Type>` immediately, then the
    /// placeholder is filled in once the body is known.
    pub fn set_kind(&mut self, id: Id<Type>, kind: TypeKind) {
        self.arena.get_mut(id).kind = kind;
    }

    /// Unwraps `Alias` layers (repeatedly, since an alias may target another
    /// alias) and a resolved `Untyped` to its concrete type. Mirrors
    /// `Type::Inner()` (`spec.md` §4.6: "`Inner()` unwraps a single layer of
    /// alias (recursive)"). Does *not* unwrap `Named`, which keeps its
    /// nominal identity through `equal`/`subtype`.
    pub fn inner(&self, id: Id<Type>) -> Id<Type> {
        let mut current = id;
        loop {
            current = match self.get(current).kind {
                TypeKind::Untyped { key } => match self.unt_entries[self.find(key as usize)].concrete_type {
                    Some(concrete) => concrete,
                    None => return current,
                },
                TypeKind::Alias(inner) => inner,
                _ => return current,
            };
        }
    }

    /// Fully unwraps `Alias`/`Untyped` layers (via [`Self::inner`]) and any
    /// `Named` layers down to a structural type. Mirrors `Type::FullUnwrap()`.
    pub fn full_unwrap(&self, id: Id<Type>) -> Id<Type> {
        let mut current = self.inner(id);
        loop {
            current = match &self.get(current).kind {
                TypeKind::Named { inner, .. } => self.inner(*inner),
                _ => return current,
            };
        }
    }

    pub fn is_number_type(&self, id: Id<Type>) -> bool {
        matches!(
            self.get(self.full_unwrap(id)).kind,
            TypeKind::Int { .. } | TypeKind::Float { .. }
        )
    }

    pub fn is_int_type(&self, id: Id<Type>) -> bool {
        matches!(self.get(self.full_unwrap(id)).kind, TypeKind::Int { .. })
    }

    pub fn is_null_type(&self, id: Id<Type>) -> bool {
        if let TypeKind::Untyped { key } = self.get(id).kind {
            return self.unt_entries[self.find(key as usize)].kind == UntypedKind::Null;
        }
        false
    }

    /// Registers a fresh untyped-literal inference variable and returns its
    /// `Type`. Mirrors `TypeContext::AddUntyped`.
    pub fn add_untyped(&mut self, kind: UntypedKind) -> Id<Type> {
        let key = self.unt_parent.len() as u32;
        self.unt_parent.push(key);
        self.unt_rank.push(0);
        self.unt_entries.push(UntypedEntry {
            kind,
            concrete_type: None,
        });
        self.alloc(TypeKind::Untyped { key })
    }

    /// Assigns every still-unconstrained untyped its default concrete type
    /// (`spec.md` §4.6: `int`/`num` default to `i64`, `float` defaults to
    /// `f64`). Called once per declaration group after inference settles.
    pub fn infer_all(&mut self, primitives: &Primitives) {
        for root in 0..self.unt_entries.len() {
            if self.unt_parent[root] as usize != root {
                continue;
            }
            let entry = &mut self.unt_entries[root];
            if entry.concrete_type.is_none() {
                entry.concrete_type = Some(match entry.kind {
                    UntypedKind::Int | UntypedKind::Num => primitives.i64,
                    UntypedKind::Float => primitives.f64,
                    UntypedKind::Null => primitives.ptr_u8,
                });
            }
        }
    }

    /// Resets all per-declaration-group untyped state, keeping the arena
    /// (and every `Id<Type>` already handed out from it) intact.
    pub fn clear_untyped(&mut self) {
        self.unt_parent.clear();
        self.unt_rank.clear();
        self.unt_entries.clear();
        self.infer_enabled = false;
    }

    // -- comparisons ---------------------------------------------------

    pub fn equal(&mut self, a: Id<Type>, b: Id<Type>) -> bool {
        let (a, b) = (self.inner(a), self.inner(b));
        self.inner_equal(a, b)
    }

    pub fn subtype(&mut self, sub: Id<Type>, sup: Id<Type>) -> TypeConvResult {
        let (sub, sup) = (self.inner(sub), self.inner(sup));
        self.inner_subtype(sub, sup)
    }

    pub fn cast(&mut self, src: Id<Type>, dest: Id<Type>) -> bool {
        let (src, dest) = (self.inner(src), self.inner(dest));
        self.inner_cast(src, dest)
    }

    fn inner_equal(&mut self, a: Id<Type>, b: Id<Type>) -> bool {
        let a_untyped = matches!(self.get(a).kind, TypeKind::Untyped { .. });
        let b_untyped = matches!(self.get(b).kind, TypeKind::Untyped { .. });

        if a_untyped || b_untyped {
            return match (a_untyped, b_untyped) {
                (true, true) => {
                    let (TypeKind::Untyped { key: ka }, TypeKind::Untyped { key: kb }) =
                        (self.get(a).kind, self.get(b).kind)
                    else {
                        unreachable!()
                    };
                    self.try_union(ka, kb)
                }
                (true, false) => {
                    let TypeKind::Untyped { key } = self.get(a).kind else {
                        unreachable!()
                    };
                    self.try_concrete(key, b)
                }
                (false, true) => {
                    let TypeKind::Untyped { key } = self.get(b).kind else {
                        unreachable!()
                    };
                    self.try_concrete(key, a)
                }
                (false, false) => unreachable!(),
            };
        }

        match (&self.get(a).kind, &self.get(b).kind) {
            (TypeKind::Int { bits: ab, signed: asg }, TypeKind::Int { bits: bb, signed: bsg }) => {
                ab == bb && asg == bsg
            }
            (TypeKind::Float { bits: ab }, TypeKind::Float { bits: bb }) => ab == bb,
            (TypeKind::Bool, TypeKind::Bool) => true,
            (TypeKind::Unit, TypeKind::Unit) => true,
            (TypeKind::String, TypeKind::String) => true,
            (TypeKind::Slice(ae), TypeKind::Slice(be)) => {
                let (ae, be) = (*ae, *be);
                self.equal(ae, be)
            }
            (TypeKind::Array { elem: ae, len: al }, TypeKind::Array { elem: be, len: bl }) => {
                if al != bl {
                    return false;
                }
                let (ae, be) = (*ae, *be);
                self.equal(ae, be)
            }
            (TypeKind::Pointer(ae), TypeKind::Pointer(be)) => {
                let (ae, be) = (*ae, *be);
                self.equal(ae, be)
            }
            (TypeKind::Function { params: ap, ret: ar }, TypeKind::Function { params: bp, ret: br }) => {
                if ap.len() != bp.len() {
                    return false;
                }
                let (ap, bp, ar, br) = (ap.clone(), bp.clone(), *ar, *br);
                for (pa, pb) in ap.iter().zip(bp.iter()) {
                    if !self.equal(*pa, *pb) {
                        return false;
                    }
                }
                self.equal(ar, br)
            }
            (TypeKind::Named { mod_id: am, name: an, .. }, TypeKind::Named { mod_id: bm, name: bn, .. }) => {
                am == bm && an == bn
            }
            (TypeKind::Struct { fields: af, .. }, TypeKind::Struct { fields: bf, .. }) => {
                if af.len() != bf.len() {
                    return false;
                }
                let pairs: Vec<_> = af.iter().zip(bf.iter()).map(|(x, y)| (x.name, x.ty, y.name, y.ty)).collect();
                for (an, at, bn, bt) in pairs {
                    if an != bn || !self.equal(at, bt) {
                        return false;
                    }
                }
                true
            }
            _ => false,
        }
    }

    fn inner_subtype(&mut self, sub: Id<Type>, sup: Id<Type>) -> TypeConvResult {
        if let (TypeKind::Array { elem: sub_elem, .. }, TypeKind::Slice(sup_elem) | TypeKind::String)
            = (&self.get(sub).kind, &self.get(sup).kind)
        {
            let sub_elem = *sub_elem;
            let sup_elem = match &self.get(sup).kind {
                TypeKind::Slice(e) => *e,
                TypeKind::String => {
                    return if matches!(self.get(sub_elem).kind, TypeKind::Int { bits: 8, signed: false }) {
                        TypeConvResult::Cast
                    } else {
                        TypeConvResult::Fail
                    };
                }
                _ => unreachable!(),
            };
            return if self.equal(sup_elem, sub_elem) {
                TypeConvResult::Cast
            } else {
                TypeConvResult::Fail
            };
        }

        if self.inner_equal(sub, sup) {
            TypeConvResult::Eq
        } else {
            TypeConvResult::Fail
        }
    }

    fn inner_cast(&mut self, src: Id<Type>, dest: Id<Type>) -> bool {
        if let TypeKind::Untyped { key } = self.get(src).kind {
            if self.is_number_type(dest) {
                self.try_concrete(key, dest);
                return true;
            }
            if matches!(self.get(dest).kind, TypeKind::Bool | TypeKind::Pointer(_)) {
                let root = self.find(key as usize);
                return matches!(self.unt_entries[root].kind, UntypedKind::Int | UntypedKind::Num);
            }
            return false;
        }

        if let TypeKind::Named { inner, .. } = &self.get(dest).kind {
            if !matches!(self.get(src).kind, TypeKind::Named { .. }) {
                let inner = *inner;
                return self.cast(src, inner);
            }
        } else if let TypeKind::Named { inner, .. } = &self.get(src).kind {
            let inner = *inner;
            return self.cast(inner, dest);
        }

        match (&self.get(src).kind, &self.get(dest).kind) {
            (TypeKind::Int { .. }, TypeKind::Int { .. } | TypeKind::Float { .. }) => true,
            (TypeKind::Float { .. }, TypeKind::Int { .. } | TypeKind::Float { .. }) => true,
            (TypeKind::Int { .. }, TypeKind::Pointer(_) | TypeKind::Enum { .. }) if self.unsafe_enabled => true,
            (TypeKind::Pointer(_), TypeKind::Int { .. }) if self.unsafe_enabled => true,
            (TypeKind::Pointer(_), TypeKind::Pointer(_)) if self.unsafe_enabled => true,
            (TypeKind::Enum { .. }, TypeKind::Int { .. }) => true,
            (TypeKind::Int { .. }, TypeKind::Enum { .. }) => true,
            _ => self.inner_equal(src, dest),
        }
    }

    // -- union-find ------------------------------------------------------

    fn find(&self, key: usize) -> usize {
        let mut root = key;
        while self.unt_parent[root] as usize != root {
            root = self.unt_parent[root] as usize;
        }
        root
    }

    /// Attempts to merge two untyped inference variables. Returns whether
    /// their kinds are compatible; only mutates the union-find when
    /// `infer_enabled` is set, matching the teacher's "Equal becomes
    /// MustEqual under TC_INFER" semantics.
    fn try_union(&mut self, a: u32, b: u32) -> bool {
        let ra = self.find(a as usize);
        let rb = self.find(b as usize);
        if ra == rb {
            return true;
        }

        let (ea, eb) = (self.unt_entries[ra], self.unt_entries[rb]);
        let b_dominant = match (ea.kind, eb.kind) {
            (UntypedKind::Num, _) => true,
            (_, UntypedKind::Num) => false,
            (ka, kb) if ka == kb => false,
            _ => return false,
        };

        if !self.infer_enabled {
            return true;
        }

        let dominant = if b_dominant { eb } else { ea };
        if self.unt_rank[ra] < self.unt_rank[rb] {
            self.unt_parent[ra] = rb as u32;
            self.unt_entries[rb] = dominant;
        } else if self.unt_rank[ra] > self.unt_rank[rb] {
            self.unt_parent[rb] = ra as u32;
            self.unt_entries[ra] = dominant;
        } else {
            self.unt_parent[rb] = ra as u32;
            self.unt_entries[ra] = dominant;
            self.unt_rank[ra] += 1;
        }
        true
    }

    /// Attempts to unify the untyped at `key` with the concrete type
    /// `other`. When `infer_enabled`, a compatible match is recorded as the
    /// untyped's resolved concrete type.
    fn try_concrete(&mut self, key: u32, other: Id<Type>) -> bool {
        let root = self.find(key as usize);
        let compatible = match self.unt_entries[root].kind {
            UntypedKind::Float => matches!(self.get(other).kind, TypeKind::Float { .. }),
            UntypedKind::Int => matches!(self.get(other).kind, TypeKind::Int { .. }),
            UntypedKind::Num => self.is_number_type(other),
            UntypedKind::Null => matches!(self.get(other).kind, TypeKind::Pointer(_)),
        };

        if compatible && self.infer_enabled {
            self.unt_entries[root].concrete_type = Some(other);
        }
        compatible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::PlatformDescriptor;

    fn ctx() -> (TypeContext, Primitives) {
        TypeContext::new(&PlatformDescriptor::new("linux", "x64", WordSize::Bits64))
    }

    #[test]
    fn identical_primitives_are_equal() {
        let (mut ctx, prims) = ctx();
        assert!(ctx.equal(prims.i32, prims.i32));
        assert!(!ctx.equal(prims.i32, prims.i64));
    }

    #[test]
    fn untyped_num_unifies_with_concrete_float() {
        let (mut ctx, prims) = ctx();
        ctx.infer_enabled = true;
        let untyped = ctx.add_untyped(UntypedKind::Num);
        assert!(ctx.equal(untyped, prims.f64));
        assert!(ctx.equal(untyped, prims.f64));
    }

    #[test]
    fn mismatched_untyped_kinds_fail() {
        let (mut ctx, _prims) = ctx();
        ctx.infer_enabled = true;
        let a = ctx.add_untyped(UntypedKind::Int);
        let b = ctx.add_untyped(UntypedKind::Float);
        assert!(!ctx.equal(a, b));
    }

    #[test]
    fn array_is_subtype_of_matching_slice() {
        let (mut ctx, prims) = ctx();
        let arr = ctx.alloc(TypeKind::Array { elem: prims.u8, len: 4 });
        let slice = ctx.alloc(TypeKind::Slice(prims.u8));
        assert_eq!(ctx.subtype(arr, slice), TypeConvResult::Cast);
    }

    #[test]
    fn infer_all_defaults_untyped_int_to_i64() {
        let (mut ctx, prims) = ctx();
        let untyped = ctx.add_untyped(UntypedKind::Int);
        ctx.infer_all(&prims);
        assert!(ctx.equal(untyped, prims.i64));
    }
}
