//! Symbols, declarations, and per-declaration bookkeeping.
//!
//! Grounded directly on `examples/original_source/include/symbol.hpp`
//! (`SymbolFlags`, `Symbol`, `Decl`), translated from the C++ bitset-of-int
//! and raw-pointer fields to a Rust bitflags-style struct and arena `Id`s.
//! `llvm_value`/`hir_decl`'s raw-pointer slots become `Option<Id<_>>`, filled
//! in by the checker once HIR exists.

use crate::arena::Id;
use crate::ast::{Attribute as AstAttribute, Decl as AstDecl};
use crate::string_interning::StringId;
use crate::tokenizer::tokens::Span;
use crate::types::Type;

/// A minimal `bitflags!`-alike, since the crate avoids pulling in the
/// `bitflags` dependency for a single five-bit set.
macro_rules! bitflags_like {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $repr:ty {
            $(const $variant:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name($repr);

        impl $name {
            $(pub const $variant: $name = $name($value);)*

            pub const fn empty() -> Self {
                $name(0)
            }

            pub const fn contains(self, other: $name) -> bool {
                (self.0 & other.0) == other.0
            }

            pub fn insert(&mut self, other: $name) {
                self.0 |= other.0;
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }
    };
}

bitflags_like! {
    /// `spec.md` §3: "Flags are a bitset over {variable, function, type,
    /// constant, exported}".
    pub struct SymbolFlags: u8 {
        const VAR = 1 << 0;
        const FUNC = 1 << 1;
        const TYPE = 1 << 2;
        const CONST = 1 << 3;
        const EXPORTED = 1 << 4;
    }
}

impl SymbolFlags {
    /// "a symbol is compile-time if its flags include type or constant"
    /// (`spec.md` §3).
    pub fn is_comptime(self) -> bool {
        self.contains(SymbolFlags::TYPE) || self.contains(SymbolFlags::CONST)
    }
}

/// `(parent_module_id, name, span, flags, decl_index, type, immutable?)`
/// per `spec.md` §3. `type` is filled in once the checker resolves it;
/// `None` before that point (mirrors the original's `nullptr`-initialized
/// `Type*`).
#[derive(Debug, Clone)]
pub struct Symbol {
    pub parent_module_id: u32,
    pub name: StringId,
    pub span: Span,
    pub flags: SymbolFlags,
    pub decl_index: usize,
    pub ty: Option<Id<Type>>,
    pub immutable: bool,
}

impl Symbol {
    pub fn new(parent_module_id: u32, name: StringId, span: Span, flags: SymbolFlags, decl_index: usize) -> Self {
        Self {
            parent_module_id,
            name,
            span,
            flags,
            decl_index,
            ty: None,
            immutable: false,
        }
    }
}

/// Three-color marking for the resolver's cycle-detecting DFS
/// (`spec.md` §4.5, Glossary: "Cycle color (white/grey/black)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GColor {
    #[default]
    White,
    Grey,
    Black,
}

/// A kind tag distinguishing the eight declaration forms `spec.md` §3
/// names, used by the resolver to decide whether a decl belongs to the
/// type/const sort or the variable/function tail block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKindTag {
    Func,
    Method,
    Factory,
    GlobalVar,
    GlobalConst,
    Struct,
    Alias,
    Enum,
}

impl DeclKindTag {
    /// The resolver sorts only type/const decls; variables and functions
    /// are appended as a block afterward in source order (`spec.md` §4.5).
    pub fn participates_in_sort(self) -> bool {
        matches!(self, DeclKindTag::GlobalConst | DeclKindTag::Struct | DeclKindTag::Alias | DeclKindTag::Enum)
    }
}

/// A single module-level declaration: its owning file, attributes, AST
/// node, and (once checked) HIR node. Grounded on `symbol.hpp`'s `Decl`.
#[derive(Debug, Clone)]
pub struct Decl {
    pub file_id: u32,
    pub insertion_order: usize,
    pub kind: DeclKindTag,
    pub color: GColor,
    pub attrs: Vec<AstAttribute>,
    pub ast: AstDecl,
    pub hir: Option<Id<crate::hir::HirDecl>>,
}

impl Decl {
    pub fn new(file_id: u32, insertion_order: usize, kind: DeclKindTag, ast: AstDecl) -> Self {
        let attrs = ast.attrs.clone();
        Self {
            file_id,
            insertion_order,
            kind,
            color: GColor::White,
            attrs,
            ast,
            hir: None,
        }
    }
}
