//! The meta-if preprocessor: `#if(expr)` / `#elif(expr)` / `#end` and
//! `#require(expr)`, evaluated against a fixed set of platform
//! meta-variables (`spec.md` §4.3).
//!
//! The directive expression grammar is a strict subset of the main
//! expression grammar (bool/string/int literals, `&&`/`||`/`==`/`!=`, unary
//! `!`, parens, bare identifiers), so it reuses the main lexer's tokens
//! rather than re-tokenizing raw text — the "re-lexed in directive context"
//! language in `spec.md` §4.2 is satisfied by parsing directly from the
//! already-tokenized stream instead of introducing a second lexer.

use crate::string_interning::StringTable;
use crate::target::PlatformDescriptor;
use crate::tokenizer::tokens::{FileTokens, TokenKind};

#[derive(Debug, Clone)]
pub enum DirectiveExpr {
    Bool(bool),
    Str(String),
    Int(i64),
    Ident(String),
    Not(Box<DirectiveExpr>),
    And(Box<DirectiveExpr>, Box<DirectiveExpr>),
    Or(Box<DirectiveExpr>, Box<DirectiveExpr>),
    Eq(Box<DirectiveExpr>, Box<DirectiveExpr>),
    Ne(Box<DirectiveExpr>, Box<DirectiveExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveValue {
    Bool(bool),
    Str(String),
    Int(i64),
}

impl DirectiveValue {
    pub fn truthy(&self) -> bool {
        match self {
            DirectiveValue::Bool(b) => *b,
            DirectiveValue::Str(s) => !s.is_empty(),
            DirectiveValue::Int(i) => *i != 0,
        }
    }
}

pub struct DirectiveParseError(pub String);

/// Parses a fully parenthesized directive expression: `(` expr `)`.
/// Precedence, loosest to tightest: `||` < `&&` < `{==,!=}` < unary `!` <
/// primary.
pub fn parse_directive_expr(
    tokens: &mut FileTokens,
    table: &StringTable,
) -> Result<DirectiveExpr, DirectiveParseError> {
    expect(tokens, &TokenKind::LParen)?;
    let expr = parse_or(tokens, table)?;
    expect(tokens, &TokenKind::RParen)?;
    Ok(expr)
}

fn expect(tokens: &mut FileTokens, want: &TokenKind) -> Result<(), DirectiveParseError> {
    if std::mem::discriminant(tokens.current_kind()) == std::mem::discriminant(want) {
        tokens.advance();
        Ok(())
    } else {
        Err(DirectiveParseError(format!(
            "expected {} in directive expression but found {}",
            want.describe(),
            tokens.current_kind().describe()
        )))
    }
}

fn parse_or(tokens: &mut FileTokens, table: &StringTable) -> Result<DirectiveExpr, DirectiveParseError> {
    let mut lhs = parse_and(tokens, table)?;
    while matches!(tokens.current_kind(), TokenKind::PipePipe) {
        tokens.advance();
        let rhs = parse_and(tokens, table)?;
        lhs = DirectiveExpr::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_and(tokens: &mut FileTokens, table: &StringTable) -> Result<DirectiveExpr, DirectiveParseError> {
    let mut lhs = parse_eq(tokens, table)?;
    while matches!(tokens.current_kind(), TokenKind::AmpAmp) {
        tokens.advance();
        let rhs = parse_eq(tokens, table)?;
        lhs = DirectiveExpr::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_eq(tokens: &mut FileTokens, table: &StringTable) -> Result<DirectiveExpr, DirectiveParseError> {
    let lhs = parse_unary(tokens, table)?;
    match tokens.current_kind() {
        TokenKind::EqEq => {
            tokens.advance();
            let rhs = parse_unary(tokens, table)?;
            Ok(DirectiveExpr::Eq(Box::new(lhs), Box::new(rhs)))
        }
        TokenKind::Ne => {
            tokens.advance();
            let rhs = parse_unary(tokens, table)?;
            Ok(DirectiveExpr::Ne(Box::new(lhs), Box::new(rhs)))
        }
        _ => Ok(lhs),
    }
}

fn parse_unary(tokens: &mut FileTokens, table: &StringTable) -> Result<DirectiveExpr, DirectiveParseError> {
    if matches!(tokens.current_kind(), TokenKind::Bang) {
        tokens.advance();
        let inner = parse_unary(tokens, table)?;
        return Ok(DirectiveExpr::Not(Box::new(inner)));
    }
    parse_primary(tokens, table)
}

fn parse_primary(tokens: &mut FileTokens, table: &StringTable) -> Result<DirectiveExpr, DirectiveParseError> {
    let expr = match tokens.current_kind().clone() {
        TokenKind::BoolLit(b) => DirectiveExpr::Bool(b),
        TokenKind::StringLit(id) => DirectiveExpr::Str(table.resolve(id).to_string()),
        TokenKind::IntLit { text, .. } => {
            let raw = table.resolve(text);
            let value = raw.parse::<i64>().map_err(|_| {
                DirectiveParseError(format!("'{raw}' is not a valid integer in a directive expression"))
            })?;
            DirectiveExpr::Int(value)
        }
        TokenKind::Ident(id) => DirectiveExpr::Ident(table.resolve(id).to_string()),
        TokenKind::LParen => {
            tokens.advance();
            let inner = parse_or(tokens, table)?;
            expect(tokens, &TokenKind::RParen)?;
            return Ok(inner);
        }
        other => {
            return Err(DirectiveParseError(format!(
                "unexpected {} in directive expression",
                other.describe()
            )))
        }
    };
    tokens.advance();
    Ok(expr)
}

/// Evaluates a directive expression against the platform's meta-variables.
/// An identifier with no binding evaluates to the empty string, per
/// `spec.md` §4.3.
pub fn eval_directive(expr: &DirectiveExpr, platform: &PlatformDescriptor) -> DirectiveValue {
    match expr {
        DirectiveExpr::Bool(b) => DirectiveValue::Bool(*b),
        DirectiveExpr::Str(s) => DirectiveValue::Str(s.clone()),
        DirectiveExpr::Int(i) => DirectiveValue::Int(*i),
        DirectiveExpr::Ident(name) => {
            if let Some(s) = platform.meta_str(name) {
                DirectiveValue::Str(s.to_string())
            } else if let Some(b) = platform.meta_bool(name) {
                DirectiveValue::Bool(b)
            } else if let Some(i) = platform.meta_int(name) {
                DirectiveValue::Int(i)
            } else {
                DirectiveValue::Str(String::new())
            }
        }
        DirectiveExpr::Not(inner) => DirectiveValue::Bool(!eval_directive(inner, platform).truthy()),
        DirectiveExpr::And(a, b) => {
            let lhs = eval_directive(a, platform);
            if !lhs.truthy() {
                return DirectiveValue::Bool(false);
            }
            DirectiveValue::Bool(eval_directive(b, platform).truthy())
        }
        DirectiveExpr::Or(a, b) => {
            let lhs = eval_directive(a, platform);
            if lhs.truthy() {
                return DirectiveValue::Bool(true);
            }
            DirectiveValue::Bool(eval_directive(b, platform).truthy())
        }
        DirectiveExpr::Eq(a, b) => DirectiveValue::Bool(eval_directive(a, platform) == eval_directive(b, platform)),
        DirectiveExpr::Ne(a, b) => DirectiveValue::Bool(eval_directive(a, platform) != eval_directive(b, platform)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::WordSize;

    fn platform() -> PlatformDescriptor {
        PlatformDescriptor::new("linux", "x64", WordSize::Bits64).with_debug(true)
    }

    fn eval_str(src: &str) -> DirectiveValue {
        let mut table = StringTable::new();
        let tokens = crate::tokenizer::lex_source(src, &mut table).unwrap();
        let mut ft = FileTokens::new(crate::module_path::ModulePath::new(), tokens);
        let expr = parse_directive_expr(&mut ft, &table).unwrap();
        eval_directive(&expr, &platform())
    }

    #[test]
    fn os_equality() {
        assert_eq!(eval_str("(OS == \"linux\")"), DirectiveValue::Bool(true));
        assert_eq!(eval_str("(OS == \"windows\")"), DirectiveValue::Bool(false));
    }

    #[test]
    fn unknown_identifier_is_falsy_empty_string() {
        assert_eq!(eval_str("(UNKNOWN_VAR)"), DirectiveValue::Str(String::new()));
        assert!(!eval_str("(UNKNOWN_VAR)").truthy());
    }

    #[test]
    fn debug_and_not_combine() {
        assert_eq!(eval_str("(DEBUG && !(OS == \"windows\"))"), DirectiveValue::Bool(true));
    }
}
