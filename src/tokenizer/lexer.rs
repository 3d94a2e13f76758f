//! Converts source text into a flat token stream.
//!
//! Grounded on the teacher's `compiler_frontend::tokenizer::tokenizer`
//! (`TokenStream` cursor over `Peekable<Chars>`, `return_token!`-style early
//! returns, keyword lookup after accumulating an identifier) but rebuilt
//! around `spec.md` §4.2's own grammar: number bases, rune literals, `#`
//! directives, and non-nesting block comments rather than the teacher's
//! template/scene syntax.

use crate::string_interning::StringTable;
use crate::tokenizer::tokens::{NumberBase, Position, Span, Token, TokenKind};

/// A lexical error, fatal to the file's token stream (`spec.md` §4.2).
#[derive(Debug, Clone)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

impl LexError {
    fn at(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    col: u32,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek2(&self) -> Option<char> {
        let mut clone = self.chars.clone();
        clone.next();
        clone.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        match c {
            '\n' => {
                self.line += 1;
                self.col = 1;
            }
            '\t' => self.col += 4,
            _ => self.col += 1,
        }
        Some(c)
    }
}

/// Tokenizes `source` in full, interning identifiers/literal text into
/// `table`. Stops at the first lexical error, per `spec.md` §4.2's "throw
/// the lexing context away for this token stream" contract.
pub fn lex_source(source: &str, table: &mut StringTable) -> Result<Vec<Token>, LexError> {
    let estimate = source.len() / crate::settings::SRC_TO_TOKEN_RATIO;
    let mut tokens = Vec::with_capacity(estimate.max(16));
    let mut cursor = Cursor::new(source);

    loop {
        let token = next_token(&mut cursor, table)?;
        let is_eof = matches!(token.kind, TokenKind::Eof);
        tokens.push(token);
        if is_eof {
            break;
        }
    }

    Ok(tokens)
}

fn next_token(cursor: &mut Cursor, table: &mut StringTable) -> Result<Token, LexError> {
    loop {
        match cursor.peek() {
            None => return Ok(Token::new(TokenKind::Eof, Span::single(cursor.pos()))),
            Some(c) if c.is_whitespace() => {
                cursor.bump();
                continue;
            }
            Some('/') if cursor.peek2() == Some('/') => {
                skip_line_comment(cursor);
                continue;
            }
            Some('/') if cursor.peek2() == Some('*') => {
                skip_block_comment(cursor)?;
                continue;
            }
            _ => break,
        }
    }

    let start = cursor.pos();
    let c = cursor.bump().expect("checked by peek above");

    if c == '_' || c.is_alphabetic() {
        return lex_ident_or_keyword(cursor, table, start, c);
    }
    if c.is_ascii_digit() {
        return lex_number(cursor, table, start, c);
    }

    match c {
        '#' => lex_directive(cursor, table, start),
        '"' => lex_string(cursor, table, start),
        '\'' => lex_rune(cursor, start),
        '(' => single(TokenKind::LParen, start, cursor),
        ')' => single(TokenKind::RParen, start, cursor),
        '[' => single(TokenKind::LBracket, start, cursor),
        ']' => single(TokenKind::RBracket, start, cursor),
        '{' => single(TokenKind::LBrace, start, cursor),
        '}' => single(TokenKind::RBrace, start, cursor),
        ',' => single(TokenKind::Comma, start, cursor),
        '.' => single(TokenKind::Dot, start, cursor),
        ';' => single(TokenKind::Semi, start, cursor),
        ':' => single(TokenKind::Colon, start, cursor),
        '@' => single(TokenKind::At, start, cursor),
        '+' => choose(cursor, start, '=', TokenKind::PlusAssign, TokenKind::Plus),
        '-' => choose(cursor, start, '=', TokenKind::MinusAssign, TokenKind::Minus),
        '*' => choose(cursor, start, '=', TokenKind::StarAssign, TokenKind::Star),
        '%' => choose(cursor, start, '=', TokenKind::PercentAssign, TokenKind::Percent),
        '^' => choose(cursor, start, '=', TokenKind::CaretAssign, TokenKind::Caret),
        '!' => choose(cursor, start, '=', TokenKind::Ne, TokenKind::Bang),
        '=' => choose(cursor, start, '=', TokenKind::EqEq, TokenKind::Assign),
        '/' => choose(cursor, start, '=', TokenKind::SlashAssign, TokenKind::Slash),
        '&' => lex_amp(cursor, start),
        '|' => lex_pipe(cursor, start),
        '<' => lex_lt(cursor, start),
        '>' => lex_gt(cursor, start),
        other => Err(LexError::at(
            Span::single(start),
            format!("unknown character '{other}' in source"),
        )),
    }
}

fn single(kind: TokenKind, start: Position, cursor: &Cursor) -> Result<Token, LexError> {
    Ok(Token::new(kind, Span::new(start, cursor.pos())))
}

fn choose(
    cursor: &mut Cursor,
    start: Position,
    expect: char,
    then: TokenKind,
    otherwise: TokenKind,
) -> Result<Token, LexError> {
    if cursor.peek() == Some(expect) {
        cursor.bump();
        single(then, start, cursor)
    } else {
        single(otherwise, start, cursor)
    }
}

fn lex_amp(cursor: &mut Cursor, start: Position) -> Result<Token, LexError> {
    if cursor.peek() == Some('&') {
        cursor.bump();
        return choose(cursor, start, '=', TokenKind::AmpAmpAssign, TokenKind::AmpAmp);
    }
    choose(cursor, start, '=', TokenKind::AmpAssign, TokenKind::Amp)
}

fn lex_pipe(cursor: &mut Cursor, start: Position) -> Result<Token, LexError> {
    if cursor.peek() == Some('|') {
        cursor.bump();
        return choose(cursor, start, '=', TokenKind::PipePipeAssign, TokenKind::PipePipe);
    }
    choose(cursor, start, '=', TokenKind::PipeAssign, TokenKind::Pipe)
}

fn lex_lt(cursor: &mut Cursor, start: Position) -> Result<Token, LexError> {
    if cursor.peek() == Some('<') {
        cursor.bump();
        return choose(cursor, start, '=', TokenKind::ShlAssign, TokenKind::Shl);
    }
    choose(cursor, start, '=', TokenKind::Le, TokenKind::Lt)
}

fn lex_gt(cursor: &mut Cursor, start: Position) -> Result<Token, LexError> {
    if cursor.peek() == Some('>') {
        cursor.bump();
        return choose(cursor, start, '=', TokenKind::ShrAssign, TokenKind::Shr);
    }
    choose(cursor, start, '=', TokenKind::Ge, TokenKind::Gt)
}

fn skip_line_comment(cursor: &mut Cursor) {
    cursor.bump();
    cursor.bump();
    while let Some(c) = cursor.peek() {
        if c == '\n' {
            break;
        }
        cursor.bump();
    }
}

/// Block comments do not nest: the first `*/` closes the comment regardless
/// of how many `/*` appeared inside it.
fn skip_block_comment(cursor: &mut Cursor) -> Result<(), LexError> {
    let start = cursor.pos();
    cursor.bump();
    cursor.bump();
    loop {
        match cursor.peek() {
            None => return Err(LexError::at(Span::single(start), "unterminated block comment")),
            Some('*') if cursor.peek2() == Some('/') => {
                cursor.bump();
                cursor.bump();
                return Ok(());
            }
            Some(_) => {
                cursor.bump();
            }
        }
    }
}

fn lex_ident_or_keyword(
    cursor: &mut Cursor,
    table: &mut StringTable,
    start: Position,
    first: char,
) -> Result<Token, LexError> {
    let mut text = String::new();
    text.push(first);
    while let Some(c) = cursor.peek() {
        if c == '_' || c.is_alphanumeric() {
            text.push(c);
            cursor.bump();
        } else {
            break;
        }
    }

    if let Some(kw) = TokenKind::keyword_from_str(&text) {
        return single(kw, start, cursor);
    }

    let id = table.intern(&text);
    single(TokenKind::Ident(id), start, cursor)
}

fn digit_set(base: NumberBase) -> impl Fn(char) -> bool {
    move |c: char| match base {
        NumberBase::Binary => c == '0' || c == '1',
        NumberBase::Octal => ('0'..='7').contains(&c),
        NumberBase::Decimal => c.is_ascii_digit(),
        NumberBase::Hex => c.is_ascii_hexdigit(),
    }
}

fn lex_number(
    cursor: &mut Cursor,
    table: &mut StringTable,
    start: Position,
    first: char,
) -> Result<Token, LexError> {
    let mut base = NumberBase::Decimal;
    let mut text = String::new();

    if first == '0' {
        match cursor.peek() {
            Some('b') => {
                base = NumberBase::Binary;
                cursor.bump();
            }
            Some('o') => {
                base = NumberBase::Octal;
                cursor.bump();
            }
            Some('x') => {
                base = NumberBase::Hex;
                cursor.bump();
            }
            _ => text.push(first),
        }
    } else {
        text.push(first);
    }

    let is_digit = digit_set(base);
    consume_digits(cursor, &mut text, &is_digit);

    if !matches!(base, NumberBase::Decimal | NumberBase::Hex) {
        return single(TokenKind::IntLit { text: table.intern(&text), base }, start, cursor);
    }

    let mut is_float = false;
    if cursor.peek() == Some('.') {
        is_float = true;
        text.push('.');
        cursor.bump();
        if !cursor.peek().map(&is_digit).unwrap_or(false) {
            return Err(LexError::at(
                Span::new(start, cursor.pos()),
                "expected a digit after '.' in a number literal",
            ));
        }
        consume_digits(cursor, &mut text, &is_digit);
    }

    let exponent_marker = match base {
        NumberBase::Decimal => ['e', 'E'],
        NumberBase::Hex => ['p', 'P'],
        _ => unreachable!(),
    };
    if let Some(c) = cursor.peek() {
        if exponent_marker.contains(&c) {
            is_float = true;
            text.push(c);
            cursor.bump();
            if let Some(sign @ ('+' | '-')) = cursor.peek() {
                text.push(sign);
                cursor.bump();
            }
            if !cursor.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                return Err(LexError::at(
                    Span::new(start, cursor.pos()),
                    "expected a digit after exponent sign in a number literal",
                ));
            }
            consume_digits(cursor, &mut text, &|c: char| c.is_ascii_digit());
        }
    }

    let id = table.intern(&text);
    if is_float {
        single(TokenKind::FloatLit(id), start, cursor)
    } else {
        single(TokenKind::IntLit { text: id, base }, start, cursor)
    }
}

fn consume_digits(cursor: &mut Cursor, text: &mut String, is_digit: &dyn Fn(char) -> bool) {
    while let Some(c) = cursor.peek() {
        if c == '_' {
            cursor.bump();
            continue;
        }
        if is_digit(c) {
            text.push(c);
            cursor.bump();
        } else {
            break;
        }
    }
}

fn lex_escape(cursor: &mut Cursor, start: Position) -> Result<char, LexError> {
    let Some(c) = cursor.bump() else {
        return Err(LexError::at(Span::single(start), "unterminated escape sequence"));
    };
    Ok(match c {
        'a' => '\u{7}',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\u{b}',
        '0' => '\0',
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        other => {
            return Err(LexError::at(
                Span::single(start),
                format!("unknown escape sequence '\\{other}'"),
            ))
        }
    })
}

fn lex_string(cursor: &mut Cursor, table: &mut StringTable, start: Position) -> Result<Token, LexError> {
    let mut text = String::new();
    loop {
        match cursor.peek() {
            None => return Err(LexError::at(Span::new(start, cursor.pos()), "unterminated string literal")),
            Some('\n') => return Err(LexError::at(Span::new(start, cursor.pos()), "newline in string literal")),
            Some('"') => {
                cursor.bump();
                break;
            }
            Some('\\') => {
                let escape_start = cursor.pos();
                cursor.bump();
                text.push(lex_escape(cursor, escape_start)?);
            }
            Some(c) => {
                text.push(c);
                cursor.bump();
            }
        }
    }
    let id = table.intern(&text);
    single(TokenKind::StringLit(id), start, cursor)
}

fn lex_rune(cursor: &mut Cursor, start: Position) -> Result<Token, LexError> {
    let value = match cursor.peek() {
        None => return Err(LexError::at(Span::single(start), "unterminated rune literal")),
        Some('\\') => {
            let escape_start = cursor.pos();
            cursor.bump();
            lex_escape(cursor, escape_start)?
        }
        Some(c) => {
            cursor.bump();
            c
        }
    };

    if cursor.peek() != Some('\'') {
        return Err(LexError::at(
            Span::new(start, cursor.pos()),
            "rune literal must contain exactly one codepoint",
        ));
    }
    cursor.bump();
    single(TokenKind::RuneLit(value as i32), start, cursor)
}

fn lex_directive(cursor: &mut Cursor, table: &mut StringTable, start: Position) -> Result<Token, LexError> {
    let mut name = String::new();
    while let Some(c) = cursor.peek() {
        if c == '_' || c.is_alphanumeric() {
            name.push(c);
            cursor.bump();
        } else {
            break;
        }
    }
    if name.is_empty() {
        return Err(LexError::at(Span::single(start), "expected a directive name after '#'"));
    }
    let id = table.intern(&name);
    single(TokenKind::Directive(id), start, cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut table = StringTable::new();
        lex_source(src, &mut table).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_simple_declaration() {
        let mut table = StringTable::new();
        let tokens = lex_source("let x = 1;", &mut table).unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Let));
        assert!(matches!(tokens[1].kind, TokenKind::Ident(_)));
        assert!(matches!(tokens[2].kind, TokenKind::Assign));
        assert!(matches!(tokens[3].kind, TokenKind::IntLit { .. }));
        assert!(matches!(tokens[4].kind, TokenKind::Semi));
        assert!(matches!(tokens[5].kind, TokenKind::Eof));
    }

    #[test]
    fn hex_and_binary_bases() {
        let ks = kinds("0xFF 0b101 0o17");
        assert!(matches!(&ks[0], TokenKind::IntLit { base: NumberBase::Hex, .. }));
        assert!(matches!(&ks[1], TokenKind::IntLit { base: NumberBase::Binary, .. }));
        assert!(matches!(&ks[2], TokenKind::IntLit { base: NumberBase::Octal, .. }));
    }

    #[test]
    fn float_with_exponent() {
        let ks = kinds("1.5e10");
        assert!(matches!(ks[0], TokenKind::FloatLit(_)));
    }

    #[test]
    fn block_comments_do_not_nest() {
        // The inner `/*` is inert text; the first `*/` closes the comment.
        let ks = kinds("/* a /* b */ c */ 1");
        // Everything up to the first `*/` is consumed; ` c */ 1` remains,
        // so `c` lexes as an identifier followed by `*/` which is invalid.
        assert!(matches!(ks[0], TokenKind::Ident(_)));
    }

    #[test]
    fn rejects_newline_inside_string() {
        let mut table = StringTable::new();
        assert!(lex_source("\"a\nb\"", &mut table).is_err());
    }

    #[test]
    fn directive_name_is_a_single_token() {
        let ks = kinds("#if(true)");
        assert!(matches!(ks[0], TokenKind::Directive(_)));
        assert!(matches!(ks[1], TokenKind::LParen));
    }
}
