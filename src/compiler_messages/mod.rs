//! Diagnostic collection: error/warning types plus console rendering.
//!
//! Split the same way the teacher crate splits `compiler_messages` into
//! `compiler_errors` / `display_messages` modules.

pub mod compiler_errors;
pub mod compiler_warnings;
pub mod display_messages;

pub use compiler_errors::{CompileError, CompilerMessages, ErrorKind, Fatal, FatalResult};
pub use compiler_warnings::{CompilerWarning, WarningKind};
pub use display_messages::print_compiler_messages;
