//! Compile-time constants and the driver-supplied [`Config`].
//!
//! `Config` is the interface boundary described in `spec.md` §6
//! ("Configuration consumed by the core (from the driver)"): import roots,
//! the platform descriptor, and a [`TargetPlatform`](crate::target::TargetPlatform)
//! handle. Everything else about the driver (CLI parsing, SDK discovery) is
//! out of scope and lives outside this crate.

use crate::target::PlatformDescriptor;
use std::path::PathBuf;

pub const BRY_FILE_EXTENSION: &str = "bry";

/// Name the loader treats as the implicitly-imported core module
/// (`spec.md` §4.4, step 4). Absent from `import_roots` on small/standalone
/// builds, in which case no implicit core import is added.
pub const CORE_MODULE_NAME: &str = "core";

// Rough heuristics for pre-sizing hot collections, sized the same way the
// teacher crate pre-sizes its token/node vectors from a source-length guess.
pub const SRC_TO_TOKEN_RATIO: usize = 5;
pub const TOKEN_TO_NODE_RATIO: usize = 10;
pub const MINIMUM_STRING_TABLE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Config {
    /// Ordered list of filesystem roots searched for imports, in priority
    /// order. The standard-library root (if any) should be included here by
    /// the driver; the loader does not special-case any particular entry
    /// besides treating `CORE_MODULE_NAME` as implicit.
    pub import_roots: Vec<PathBuf>,

    /// Platform descriptor published to the parser's `#if`/`#elif`
    /// preprocessor as meta-variables (`spec.md` §6).
    pub platform: PlatformDescriptor,

    /// Root module entry point (a single `.bry` file or a directory).
    pub entry: PathBuf,
}

impl Config {
    pub fn new(entry: PathBuf, platform: PlatformDescriptor) -> Self {
        Self {
            import_roots: Vec::new(),
            platform,
            entry,
        }
    }

    pub fn with_import_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.import_roots = roots;
        self
    }
}
