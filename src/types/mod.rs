//! The `Type` representation and primitive type table.
//!
//! Grounded on `examples/original_source/include/types.hpp`'s `Type`/
//! `TypeKind` tagged union, ported to a Rust enum over [`Id<Type>`] child
//! references (arena-indexed, per `crate::arena`'s "Keep HOW, replace WHAT"
//! reasoning) instead of raw `Type*` pointers. The untyped-literal union-find
//! machinery lives in [`context`].

pub mod context;

pub use context::{TypeContext, TypeConvResult, UntypedKind};

use crate::arena::Id;
use crate::string_interning::StringId;
use rustc_hash::FxHashMap;

/// A field of a struct type (`spec.md` §4.6).
#[derive(Debug, Clone)]
pub struct StructField {
    pub name: StringId,
    pub ty: Id<Type>,
    pub exported: bool,
}

/// Shared type information for a bound method, keyed by name in a type's
/// method table.
#[derive(Debug, Clone)]
pub struct Method {
    pub parent_id: u32,
    pub decl_number: u32,
    pub name: StringId,
    pub signature: Id<Type>,
    pub exported: bool,
}

pub type MethodTable = FxHashMap<StringId, Method>;

#[derive(Debug, Clone)]
pub struct FactoryFunc {
    pub parent_id: u32,
    pub decl_number: u32,
    pub signature: Id<Type>,
    pub exported: bool,
}

/// A Berry data type. Cheap to clone: composite variants hold [`Id<Type>`]
/// handles into the owning [`TypeContext`]'s arena rather than nested types.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    Bool,
    Unit,

    Pointer(Id<Type>),
    Function { params: Vec<Id<Type>>, ret: Id<Type> },
    Array { elem: Id<Type>, len: u64 },
    Slice(Id<Type>),
    String,

    Named {
        mod_id: u32,
        mod_name: StringId,
        name: StringId,
        inner: Id<Type>,
        methods: MethodTable,
        factory: Option<FactoryFunc>,
    },
    Alias(Id<Type>),
    Struct {
        fields: Vec<StructField>,
        name_map: FxHashMap<StringId, usize>,
    },
    Enum {
        tag_map: FxHashMap<StringId, u64>,
    },

    /// An inference variable. `key` indexes into the owning `TypeContext`'s
    /// union-find table; the concrete type (once resolved) is *not* stored
    /// here — it's looked up through the context so that unioning two
    /// untypeds doesn't require mutating every `Type` that names them.
    Untyped { key: u32 },
}

#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self.kind, TypeKind::Untyped { .. })
    }
}

/// The primitive types every `TypeContext` preallocates, matching the
/// teacher's `prim_i8_type` .. `prim_string_type` globals — realized here as
/// per-context arena ids rather than process-wide statics, since arena
/// allocation in Rust can't hand out `'static` references.
#[derive(Debug, Clone, Copy)]
pub struct Primitives {
    pub i8: Id<Type>,
    pub u8: Id<Type>,
    pub i16: Id<Type>,
    pub u16: Id<Type>,
    pub i32: Id<Type>,
    pub u32: Id<Type>,
    pub i64: Id<Type>,
    pub u64: Id<Type>,
    pub f32: Id<Type>,
    pub f64: Id<Type>,
    pub bool_: Id<Type>,
    pub unit: Id<Type>,
    pub string: Id<Type>,
    pub ptr_u8: Id<Type>,
    /// `int`/`uint` resolve to the platform's native word size (`spec.md`
    /// §4.6, "platform-dependent integer aliases").
    pub platform_int: Id<Type>,
    pub platform_uint: Id<Type>,
}
