//! `bryc`: a lexer, parser, module loader, resolver, and type checker for a
//! Berry-style statically-typed systems language front end.
//!
//! Grounded on the teacher crate's top-level module layout
//! (`compiler_frontend::mod`'s flat `pub(crate) mod` list), adapted to a
//! standalone library crate rather than a sub-module of a larger WASM
//! toolchain: every phase below is `pub` so a driver binary (`main.rs`) or
//! an embedder can call into it directly.

pub mod arena;
pub mod ast;
pub mod checker;
pub mod compiler_messages;
pub mod hir;
pub mod loader;
pub mod module;
pub mod module_path;
pub mod pipeline;
pub mod resolver;
pub mod settings;
pub mod string_interning;
pub mod symbol;
pub mod target;
pub mod tokenizer;
pub mod types;
