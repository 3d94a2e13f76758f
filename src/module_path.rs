//! Dot-separated module paths (`a.b.c`), interned component-wise.
//!
//! A `ModulePath` is how the loader identifies an import (`spec.md` §6:
//! "Import paths are dot-separated... maps to filesystem segment a/b/c").
//! Components are interned so two occurrences of the same import path compare
//! in `O(n)` `StringId` equality rather than string comparison, and so module
//! display names can be rebuilt cheaply for diagnostics.

use crate::string_interning::{StringId, StringTable};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModulePath {
    components: Vec<StringId>,
}

impl ModulePath {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    pub fn from_components(components: Vec<StringId>) -> Self {
        Self { components }
    }

    /// Parses `a.b.c` into interned components.
    pub fn from_dotted(text: &str, table: &mut StringTable) -> Self {
        Self {
            components: text.split('.').map(|part| table.intern(part)).collect(),
        }
    }

    pub fn single(component: StringId) -> Self {
        Self {
            components: vec![component],
        }
    }

    pub fn components(&self) -> &[StringId] {
        &self.components
    }

    pub fn push(&mut self, component: StringId) {
        self.components.push(component);
    }

    /// Renders the dot-separated display name used for module identity and
    /// diagnostics (`spec.md` §3: "display name (dot-separated path)").
    pub fn display_name(&self, table: &StringTable) -> String {
        self.components
            .iter()
            .map(|id| table.resolve(*id))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Maps the dotted path onto a filesystem segment (`a.b.c` -> `a/b/c`),
    /// per the import-resolution rule in `spec.md` §6.
    pub fn to_relative_path(&self, table: &StringTable) -> PathBuf {
        let mut path = PathBuf::new();
        for id in &self.components {
            path.push(table.resolve(*id));
        }
        path
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Searches `roots` in order for either `<root>/<path>.bry` or a
    /// directory `<root>/<path>/` containing at least one `.bry` file.
    pub fn resolve_against_roots(&self, roots: &[PathBuf], table: &StringTable) -> Option<PathBuf> {
        let rel = self.to_relative_path(table);
        for root in roots {
            let candidate_file = root.join(&rel).with_extension(crate::settings::BRY_FILE_EXTENSION);
            if candidate_file.is_file() {
                return Some(candidate_file);
            }

            let candidate_dir = root.join(&rel);
            if candidate_dir.is_dir() {
                return Some(candidate_dir);
            }
        }
        None
    }
}

impl Default for ModulePath {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_dotted_display_name() {
        let mut table = StringTable::new();
        let path = ModulePath::from_dotted("io.std.fmt", &mut table);
        assert_eq!(path.display_name(&table), "io.std.fmt");
        assert_eq!(path.to_relative_path(&table), PathBuf::from("io/std/fmt"));
    }
}
