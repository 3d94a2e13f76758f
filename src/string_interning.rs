//! Global string interning used across every phase of the pipeline.
//!
//! Identifiers, module names, and directive text are hot-path data: every
//! [`Token`](crate::tokenizer::tokens::Token), [`Symbol`](crate::symbol::Symbol)
//! and [`Type::Named`](crate::types::Type::Named) carries a [`StringId`]
//! rather than an owned `String`, so comparisons and clones stay `O(1)` and
//! `Copy`.

use rustc_hash::FxHashMap;

/// A unique identifier for an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

impl StringId {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn from_u32(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub fn resolve(self, table: &StringTable) -> &str {
        table.resolve(self)
    }

    #[inline]
    pub fn eq_str(self, table: &StringTable, other: &str) -> bool {
        table.resolve(self) == other
    }
}

impl std::fmt::Display for StringId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Interns every distinct string exactly once for the lifetime of a
/// compilation. Strings are never removed, so `StringId`s stay valid for as
/// long as their owning `StringTable` is alive.
#[derive(Debug, Default)]
pub struct StringTable {
    strings: Vec<Box<str>>,
    string_to_id: FxHashMap<&'static str, StringId>,
}

const DEFAULT_CAPACITY: usize = 256;

impl StringTable {
    pub fn new() -> Self {
        Self {
            strings: Vec::with_capacity(DEFAULT_CAPACITY),
            string_to_id: FxHashMap::default(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            strings: Vec::with_capacity(capacity),
            string_to_id: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Interns `s`, returning the existing id if it was already seen.
    #[inline]
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.string_to_id.get(s) {
            return id;
        }
        self.intern_new(s)
    }

    #[cold]
    fn intern_new(&mut self, s: &str) -> StringId {
        let id = StringId(self.strings.len() as u32);
        let boxed: Box<str> = s.into();

        // SAFETY: `boxed` is moved into `self.strings`, which outlives the
        // table itself; the lookup map never outlives its own table, and no
        // entry is ever removed, so the address stays valid for `'static` as
        // far as any borrower of `&StringTable` is concerned.
        let static_ref: &'static str = unsafe { std::mem::transmute::<&str, &'static str>(&boxed) };

        self.strings.push(boxed);
        self.string_to_id.insert(static_ref, id);
        id
    }

    #[inline]
    pub fn resolve(&self, id: StringId) -> &str {
        &self.strings[id.as_u32() as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut table = StringTable::new();
        let a = table.intern("hello");
        let b = table.intern("hello");
        assert_eq!(a, b);
        assert_eq!(table.resolve(a), "hello");
    }

    #[test]
    fn distinct_strings_get_distinct_ids() {
        let mut table = StringTable::new();
        let a = table.intern("foo");
        let b = table.intern("bar");
        assert_ne!(a, b);
        assert_eq!(table.resolve(a), "foo");
        assert_eq!(table.resolve(b), "bar");
    }
}
