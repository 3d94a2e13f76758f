//! The typed, resolved High-level IR the checker produces from AST.
//!
//! Grounded on the teacher's `compiler_frontend::hir` package (stable
//! `Id`-style node handles, a module-level aggregate holding parallel
//! arenas) but built for `spec.md` §3's simpler contract rather than the
//! teacher's GC/region/borrow-checking model: every HIR expression carries a
//! resolved `type`, an `assignable?` flag, and — for allocation-producing
//! constructs — an explicit stack/heap/global `alloc_mode`, per §3 and
//! §4.7 point 4. There is no region tree and no borrow analysis here; this
//! frontend hands the backend a fully typed tree and an allocation-mode
//! annotation, nothing more.

pub mod nodes;

pub use nodes::*;
