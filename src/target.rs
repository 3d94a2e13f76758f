//! Target platform description and the `sizeof`/`alignof` oracle the checker
//! and comptime evaluator consult for `spec.md` §4.8's `#sizeof`/`#alignof`
//! directives and for concretizing untyped array-length constants.
//!
//! Grounded on the teacher crate's `compiler_frontend::host::Target` shape
//! (OS/arch name pair plus a word-size flag), generalized to also carry the
//! debug flag the meta-if preprocessor exposes as `DEBUG` (`spec.md` §4.3).

use crate::arena::Id;
use crate::types::{Type, TypeContext, TypeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordSize {
    Bits32,
    Bits64,
}

impl WordSize {
    pub fn bytes(self) -> u64 {
        match self {
            WordSize::Bits32 => 4,
            WordSize::Bits64 => 8,
        }
    }
}

/// Published to the preprocessor as the `OS`, `ARCH`, `ARCH_SIZE`, `DEBUG`,
/// and `COMPILER` meta-variables (`spec.md` §4.3).
#[derive(Debug, Clone)]
pub struct PlatformDescriptor {
    pub os: String,
    pub arch: String,
    pub word_size: WordSize,
    pub debug: bool,
    pub compiler: String,
}

impl PlatformDescriptor {
    pub fn new(os: impl Into<String>, arch: impl Into<String>, word_size: WordSize) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
            word_size,
            debug: false,
            compiler: "bryc".to_string(),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The platform this process itself is running on, used by tests and by
    /// a driver that doesn't cross-compile.
    pub fn host() -> Self {
        let os = if cfg!(target_os = "windows") {
            "windows"
        } else if cfg!(target_os = "macos") {
            "macos"
        } else {
            "linux"
        };
        let arch = if cfg!(target_arch = "aarch64") {
            "arm64"
        } else {
            "x64"
        };
        let word_size = if cfg!(target_pointer_width = "64") {
            WordSize::Bits64
        } else {
            WordSize::Bits32
        };
        Self::new(os, arch, word_size)
    }

    /// Meta-variable lookup used by the preprocessor's `#if`/`#elif`
    /// evaluator (`spec.md` §4.3). Returns `None` for names it doesn't
    /// recognize as string-valued.
    pub fn meta_str(&self, name: &str) -> Option<&str> {
        match name {
            "OS" => Some(&self.os),
            "ARCH" => Some(&self.arch),
            "COMPILER" => Some(&self.compiler),
            _ => None,
        }
    }

    pub fn meta_bool(&self, name: &str) -> Option<bool> {
        match name {
            "DEBUG" => Some(self.debug),
            _ => None,
        }
    }

    pub fn meta_int(&self, name: &str) -> Option<i64> {
        match name {
            "ARCH_SIZE" => Some(self.word_size.bytes() as i64 * 8),
            _ => None,
        }
    }
}

/// The `sizeof`/`alignof` oracle, kept as a trait so tests can swap in a
/// fixed platform without touching a `PlatformDescriptor`. Layout depends on
/// the owning [`TypeContext`] because composite types hold [`Id<Type>`]
/// handles rather than nested values.
pub trait TargetPlatform {
    fn pointer_width(&self) -> WordSize;
    fn sizeof(&self, ctx: &TypeContext, ty: Id<Type>) -> u64;
    fn alignof(&self, ctx: &TypeContext, ty: Id<Type>) -> u64;
}

impl TargetPlatform for PlatformDescriptor {
    fn pointer_width(&self) -> WordSize {
        self.word_size
    }

    fn sizeof(&self, ctx: &TypeContext, ty: Id<Type>) -> u64 {
        layout_of(ctx, ty, self.word_size).0
    }

    fn alignof(&self, ctx: &TypeContext, ty: Id<Type>) -> u64 {
        layout_of(ctx, ty, self.word_size).1
    }
}

/// Returns `(size, align)` in bytes for a fully-resolved type, per `spec.md`
/// §4.6/§4.8's layout rules: scalars are self-aligned, structs are laid out
/// field-by-field with trailing padding to the max field alignment,
/// pointers/functions are pointer-sized, and arrays are `element_size * len`
/// with the element's alignment. Untyped literals have no layout: this is
/// only ever called after inference has concretized every declaration the
/// checker visits.
fn layout_of(ctx: &TypeContext, id: Id<Type>, word_size: WordSize) -> (u64, u64) {
    let resolved = ctx.full_unwrap(id);
    match &ctx.get(resolved).kind {
        TypeKind::Int { bits, .. } => {
            let bytes = (*bits as u64) / 8;
            (bytes, bytes)
        }
        TypeKind::Float { bits } => {
            let bytes = (*bits as u64) / 8;
            (bytes, bytes)
        }
        TypeKind::Bool => (1, 1),
        TypeKind::Unit => (0, 1),
        TypeKind::String | TypeKind::Pointer(_) | TypeKind::Function { .. } | TypeKind::Slice(_) => {
            let w = word_size.bytes();
            (w, w)
        }
        TypeKind::Array { elem, len } => {
            let (elem_size, elem_align) = layout_of(ctx, *elem, word_size);
            (elem_size * len, elem_align.max(1))
        }
        TypeKind::Struct { fields, .. } => {
            let mut offset = 0u64;
            let mut max_align = 1u64;
            for field in fields {
                let (fsize, falign) = layout_of(ctx, field.ty, word_size);
                max_align = max_align.max(falign);
                offset = align_up(offset, falign) + fsize;
            }
            (align_up(offset, max_align), max_align)
        }
        TypeKind::Enum { .. } => (4, 4),
        TypeKind::Named { .. } | TypeKind::Alias(_) => unreachable!("full_unwrap strips these"),
        TypeKind::Untyped { .. } => (0, 1),
    }
}

fn align_up(offset: u64, align: u64) -> u64 {
    if align == 0 {
        return offset;
    }
    (offset + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeContext;

    #[test]
    fn scalars_are_self_aligned() {
        let host = PlatformDescriptor::new("linux", "x64", WordSize::Bits64);
        let (ctx, prims) = TypeContext::new(&host);
        assert_eq!(host.sizeof(&ctx, prims.i64), 8);
        assert_eq!(host.alignof(&ctx, prims.i8), 1);
    }

    #[test]
    fn struct_layout_inserts_padding() {
        let host = PlatformDescriptor::new("linux", "x64", WordSize::Bits64);
        let (mut ctx, prims) = TypeContext::new(&host);
        let ty = ctx.alloc(TypeKind::Struct {
            fields: vec![
                crate::types::StructField { name: crate::string_interning::StringId::from_u32(0), ty: prims.u8, exported: false },
                crate::types::StructField { name: crate::string_interning::StringId::from_u32(1), ty: prims.i64, exported: false },
            ],
            name_map: Default::default(),
        });
        // u8 at offset 0, 7 bytes padding, i64 at offset 8: size 16, align 8.
        assert_eq!(host.sizeof(&ctx, ty), 16);
        assert_eq!(host.alignof(&ctx, ty), 8);
    }

    #[test]
    fn meta_variables_cover_preprocessor_needs() {
        let platform = PlatformDescriptor::new("linux", "x64", WordSize::Bits64).with_debug(true);
        assert_eq!(platform.meta_str("OS"), Some("linux"));
        assert_eq!(platform.meta_int("ARCH_SIZE"), Some(64));
        assert_eq!(platform.meta_bool("DEBUG"), Some(true));
    }
}
