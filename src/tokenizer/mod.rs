pub mod lexer;
pub mod tokens;

pub use lexer::{lex_source, LexError};
