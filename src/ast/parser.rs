//! Recursive-descent parser: declarations, Pratt-precedence expressions,
//! statements, and the meta-if preprocessor's skip-to-`#end` behavior.
//!
//! Grounded on the teacher's parser organization (one function per grammar
//! rule, a token cursor threaded through by `&mut`, attribute/visibility
//! prefixes collected before the declaration body) but rebuilt for
//! `spec.md` §4.3's grammar rather than Beanstalk's template syntax.

use crate::arena::{Arena, Id};
use crate::ast::directives::{eval_directive, parse_directive_expr};
use crate::ast::nodes::*;
use crate::compiler_messages::compiler_errors::{CompileError, CompilerMessages, ErrorKind};
use crate::string_interning::StringTable;
use crate::target::PlatformDescriptor;
use crate::tokenizer::tokens::{FileTokens, Span, Token, TokenKind};
use std::path::PathBuf;

/// Signals "abandon this declaration/statement and resynchronize"; the
/// diagnostic itself has already been pushed into `messages` by the time
/// this is returned. `spec.md` §1's Non-goals cap recovery at "resync at
/// statement boundaries", so this never escapes a single declaration.
struct Resync;
type PResult<T> = Result<T, Resync>;

pub struct Parser<'a> {
    tokens: FileTokens,
    table: &'a mut StringTable,
    platform: &'a PlatformDescriptor,
    display_path: PathBuf,
    module_name: String,
    exprs: Arena<Expr>,
    stmts: Arena<Stmt>,
    type_exprs: Arena<TypeExpr>,
    allow_struct_lit: Vec<bool>,
    messages: &'a mut CompilerMessages,
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: FileTokens,
        table: &'a mut StringTable,
        platform: &'a PlatformDescriptor,
        display_path: PathBuf,
        module_name: String,
        messages: &'a mut CompilerMessages,
    ) -> Self {
        Self {
            tokens,
            table,
            platform,
            display_path,
            module_name,
            exprs: Arena::new(),
            stmts: Arena::new(),
            type_exprs: Arena::new(),
            allow_struct_lit: vec![true],
            messages,
        }
    }

    // -- cursor helpers --------------------------------------------------

    fn cur(&self) -> &TokenKind {
        self.tokens.current_kind()
    }

    fn cur_span(&self) -> Span {
        self.tokens.current().span
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens.current().clone();
        self.tokens.advance();
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.cur()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.tokens.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> PResult<Span> {
        let span = self.cur_span();
        if self.eat(kind) {
            Ok(span)
        } else {
            self.error(format!("expected {} but got {}", kind.describe(), self.cur().describe()));
            Err(Resync)
        }
    }

    fn expect_ident(&mut self) -> PResult<(crate::string_interning::StringId, Span)> {
        let span = self.cur_span();
        if let TokenKind::Ident(id) = *self.cur() {
            self.tokens.advance();
            Ok((id, span))
        } else {
            self.error(format!("expected identifier but got {}", self.cur().describe()));
            Err(Resync)
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.messages.push_error(CompileError::new(
            ErrorKind::Syntactic,
            self.module_name.clone(),
            self.display_path.clone(),
            self.cur_span(),
            message,
        ));
    }

    /// Skips tokens until a likely declaration-start keyword or EOF, per
    /// the Non-goals' "resync at statement boundaries" allowance.
    fn synchronize_decl(&mut self) {
        loop {
            match self.cur() {
                TokenKind::Eof
                | TokenKind::Pub
                | TokenKind::Func
                | TokenKind::Struct
                | TokenKind::Type
                | TokenKind::Enum
                | TokenKind::Factory
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::At => return,
                _ => {
                    self.tokens.advance();
                }
            }
        }
    }

    fn synchronize_stmt(&mut self) {
        loop {
            match self.cur() {
                TokenKind::Eof | TokenKind::Semi | TokenKind::RBrace => return,
                _ => {
                    self.tokens.advance();
                }
            }
        }
    }

    fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> Id<Expr> {
        self.exprs.alloc(Expr { kind, span })
    }

    fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> Id<Stmt> {
        self.stmts.alloc(Stmt { kind, span })
    }

    fn alloc_type(&mut self, kind: TypeExprKind, span: Span) -> Id<TypeExpr> {
        self.type_exprs.alloc(TypeExpr { kind, span })
    }

    // -- file-level entry point ------------------------------------------

    pub fn parse_file(mut self) -> ParsedFile {
        let module_name = self.parse_module_header();
        let imports = self.parse_imports();

        let mut decls = Vec::new();
        loop {
            self.skip_directives_at_top_level();
            if matches!(self.cur(), TokenKind::Eof) {
                break;
            }
            match self.parse_decl() {
                Ok(decl) => decls.push(decl),
                Err(Resync) => self.synchronize_decl(),
            }
        }

        ParsedFile {
            module_name,
            imports,
            decls,
            exprs: self.exprs,
            stmts: self.stmts,
            type_exprs: self.type_exprs,
        }
    }

    fn parse_module_header(&mut self) -> Option<crate::string_interning::StringId> {
        if self.eat(&TokenKind::Module) {
            let name = self.expect_ident().ok().map(|(id, _)| id);
            let _ = self.expect(&TokenKind::Semi);
            return name;
        }
        None
    }

    fn parse_imports(&mut self) -> Vec<ImportDecl> {
        let mut imports = Vec::new();
        while matches!(self.cur(), TokenKind::Import) {
            let start = self.cur_span();
            self.tokens.advance();
            let mut path = Vec::new();
            loop {
                match self.expect_ident() {
                    Ok((id, _)) => path.push(id),
                    Err(Resync) => {
                        self.synchronize_decl();
                        break;
                    }
                }
                if !self.eat(&TokenKind::Dot) {
                    break;
                }
            }
            let alias = if self.eat(&TokenKind::As) {
                self.expect_ident().ok().map(|(id, _)| id)
            } else {
                None
            };
            let end = self.cur_span();
            let _ = self.expect(&TokenKind::Semi);
            if !path.is_empty() {
                imports.push(ImportDecl { path, alias, span: Span::over(start, end) });
            }
        }
        imports
    }

    /// Consumes `#if(expr)` / `#elif(expr)` / `#end` / `#require(expr)` at
    /// declaration boundaries, skipping falsy branches wholesale.
    fn skip_directives_at_top_level(&mut self) {
        loop {
            let TokenKind::Directive(name_id) = self.cur().clone() else {
                return;
            };
            let name = self.table.resolve(name_id).to_string();
            match name.as_str() {
                "if" | "elif" => {
                    self.tokens.advance();
                    let expr = match parse_directive_expr(&mut self.tokens, self.table) {
                        Ok(e) => e,
                        Err(_) => {
                            self.error("malformed directive expression");
                            self.synchronize_decl();
                            continue;
                        }
                    };
                    let truthy = eval_directive(&expr, self.platform).truthy();
                    if !truthy {
                        self.skip_to_matching_end();
                    }
                }
                "end" => {
                    self.tokens.advance();
                }
                "require" => {
                    self.tokens.advance();
                    let expr = match parse_directive_expr(&mut self.tokens, self.table) {
                        Ok(e) => e,
                        Err(_) => {
                            self.error("malformed directive expression");
                            self.synchronize_decl();
                            continue;
                        }
                    };
                    if !eval_directive(&expr, self.platform).truthy() {
                        // Abort parsing of the remainder of this file silently.
                        while !matches!(self.cur(), TokenKind::Eof) {
                            self.tokens.advance();
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn skip_to_matching_end(&mut self) {
        let mut depth = 0;
        loop {
            match self.cur().clone() {
                TokenKind::Eof => return,
                TokenKind::Directive(id) => {
                    let name = self.table.resolve(id).to_string();
                    self.tokens.advance();
                    match name.as_str() {
                        "if" => {
                            depth += 1;
                            // Consume but discard the nested condition.
                            let _ = parse_directive_expr(&mut self.tokens, self.table);
                        }
                        "elif" if depth == 0 => {
                            let expr = parse_directive_expr(&mut self.tokens, self.table);
                            if let Ok(expr) = expr {
                                if eval_directive(&expr, self.platform).truthy() {
                                    return;
                                }
                            }
                        }
                        "elif" => {
                            let _ = parse_directive_expr(&mut self.tokens, self.table);
                        }
                        "end" => {
                            if depth == 0 {
                                return;
                            }
                            depth -= 1;
                        }
                        _ => {}
                    }
                }
                _ => {
                    self.tokens.advance();
                }
            }
        }
    }

    // -- attributes -------------------------------------------------------

    fn parse_attrs(&mut self) -> AttributeList {
        let mut attrs = Vec::new();
        while matches!(self.cur(), TokenKind::At) {
            self.tokens.advance();
            if self.eat(&TokenKind::LBracket) {
                loop {
                    if let Some(attr) = self.parse_one_attr() {
                        attrs.push(attr);
                    }
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let _ = self.expect(&TokenKind::RBracket);
            } else if let Some(attr) = self.parse_one_attr() {
                attrs.push(attr);
            }
        }
        attrs
    }

    fn parse_one_attr(&mut self) -> Option<Attribute> {
        let (name, name_span) = self.expect_ident().ok()?;
        let mut value = None;
        let mut value_span = None;
        if self.eat(&TokenKind::LParen) {
            let span = self.cur_span();
            if let TokenKind::StringLit(id) = *self.cur() {
                self.tokens.advance();
                value = Some(id);
                value_span = Some(span);
            }
            let _ = self.expect(&TokenKind::RParen);
        }
        Some(Attribute { name, name_span, value, value_span })
    }

    // -- declarations -------------------------------------------------------

    fn parse_decl(&mut self) -> PResult<Decl> {
        let start = self.cur_span();
        let attrs = self.parse_attrs();
        let exported = self.eat(&TokenKind::Pub);

        match self.cur() {
            TokenKind::Func => self.parse_func_decl(start, attrs, exported, None),
            TokenKind::Factory => self.parse_factory_decl(start, attrs, exported),
            TokenKind::Let => self.parse_global_decl(start, attrs, exported, false),
            TokenKind::Const => self.parse_global_decl(start, attrs, exported, true),
            TokenKind::Struct => self.parse_struct_decl(start, attrs, exported),
            TokenKind::Type => self.parse_alias_decl(start, attrs, exported),
            TokenKind::Enum => self.parse_enum_decl(start, attrs, exported),
            other => {
                self.error(format!("expected a declaration but found {}", other.describe()));
                Err(Resync)
            }
        }
    }

    fn parse_func_decl(
        &mut self,
        start: Span,
        attrs: AttributeList,
        exported: bool,
        factory_of: Option<Id<TypeExpr>>,
    ) -> PResult<Decl> {
        self.expect(&TokenKind::Func)?;

        let mut receiver = None;
        if factory_of.is_none() && self.eat(&TokenKind::LParen) {
            receiver = Some(self.parse_type()?);
            self.expect(&TokenKind::RParen)?;
        }

        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !matches!(self.cur(), TokenKind::RParen) {
            let (pname, pspan) = self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            let ty = self.parse_type()?;
            params.push(Param { name: pname, ty, span: pspan });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;

        let ret = if self.eat(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };

        let body = if matches!(self.cur(), TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else {
            self.expect(&TokenKind::Semi)?;
            None
        };

        let end = self.cur_span();
        Ok(Decl {
            name,
            kind: DeclKind::Func { receiver, factory_of, params, ret, body },
            attrs,
            exported,
            span: Span::over(start, end),
        })
    }

    fn parse_factory_decl(&mut self, start: Span, attrs: AttributeList, exported: bool) -> PResult<Decl> {
        self.expect(&TokenKind::Factory)?;
        let ty = self.parse_type()?;
        self.parse_func_decl(start, attrs, exported, Some(ty))
    }

    fn parse_global_decl(
        &mut self,
        start: Span,
        attrs: AttributeList,
        exported: bool,
        is_const: bool,
    ) -> PResult<Decl> {
        self.tokens.advance(); // `let` / `const`
        let (name, _) = self.expect_ident()?;
        let ty = if self.eat(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        let value = if self.eat(&TokenKind::Assign) { Some(self.parse_expr()?) } else { None };
        let end = self.expect(&TokenKind::Semi)?;
        Ok(Decl {
            name,
            kind: DeclKind::Global { is_const, ty, value },
            attrs,
            exported,
            span: Span::over(start, end),
        })
    }

    fn parse_struct_decl(&mut self, start: Span, attrs: AttributeList, exported: bool) -> PResult<Decl> {
        self.expect(&TokenKind::Struct)?;
        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !matches!(self.cur(), TokenKind::RBrace) {
            let field_exported = self.eat(&TokenKind::Pub);
            let (fname, fspan) = self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            let ty = self.parse_type()?;
            fields.push(StructFieldDecl { name: fname, ty, exported: field_exported, span: fspan });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBrace)?;
        Ok(Decl {
            name,
            kind: DeclKind::Struct { fields },
            attrs,
            exported,
            span: Span::over(start, end),
        })
    }

    fn parse_alias_decl(&mut self, start: Span, attrs: AttributeList, exported: bool) -> PResult<Decl> {
        self.expect(&TokenKind::Type)?;
        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::Assign)?;
        let ty = self.parse_type()?;
        let end = self.expect(&TokenKind::Semi)?;
        Ok(Decl {
            name,
            kind: DeclKind::Alias { ty },
            attrs,
            exported,
            span: Span::over(start, end),
        })
    }

    fn parse_enum_decl(&mut self, start: Span, attrs: AttributeList, exported: bool) -> PResult<Decl> {
        self.expect(&TokenKind::Enum)?;
        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::LBrace)?;
        let mut variants = Vec::new();
        while !matches!(self.cur(), TokenKind::RBrace) {
            let (vname, _) = self.expect_ident()?;
            let value = if self.eat(&TokenKind::Assign) { Some(self.parse_expr()?) } else { None };
            variants.push((vname, value));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBrace)?;
        Ok(Decl {
            name,
            kind: DeclKind::Enum { variants },
            attrs,
            exported,
            span: Span::over(start, end),
        })
    }

    // -- type expressions ---------------------------------------------------

    fn parse_type(&mut self) -> PResult<Id<TypeExpr>> {
        let start = self.cur_span();
        match self.cur().clone() {
            TokenKind::Star | TokenKind::Amp => {
                self.tokens.advance();
                let inner = self.parse_type()?;
                Ok(self.alloc_type(TypeExprKind::Pointer(inner), start))
            }
            TokenKind::LBracket => {
                self.tokens.advance();
                if self.eat(&TokenKind::RBracket) {
                    let elem = self.parse_type()?;
                    return Ok(self.alloc_type(TypeExprKind::Slice(elem), start));
                }
                let len = self.parse_expr()?;
                self.expect(&TokenKind::RBracket)?;
                let elem = self.parse_type()?;
                Ok(self.alloc_type(TypeExprKind::Array { elem, len }, start))
            }
            TokenKind::Func => {
                self.tokens.advance();
                self.expect(&TokenKind::LParen)?;
                let mut params = Vec::new();
                while !matches!(self.cur(), TokenKind::RParen) {
                    params.push(self.parse_type()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RParen)?;
                let ret = if self.eat(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };
                Ok(self.alloc_type(TypeExprKind::Func { params, ret }, start))
            }
            TokenKind::Ident(first) => {
                self.tokens.advance();
                if matches!(self.cur(), TokenKind::Dot) {
                    let mut path = vec![first];
                    while self.eat(&TokenKind::Dot) {
                        let (seg, _) = self.expect_ident()?;
                        path.push(seg);
                    }
                    Ok(self.alloc_type(TypeExprKind::Path(path), start))
                } else {
                    Ok(self.alloc_type(TypeExprKind::Name(first), start))
                }
            }
            other if primitive_type_name(&other).is_some() => {
                let name_id = self.table.intern(primitive_type_name(&other).unwrap());
                self.tokens.advance();
                Ok(self.alloc_type(TypeExprKind::Name(name_id), start))
            }
            other => {
                self.error(format!("expected a type but found {}", other.describe()));
                Err(Resync)
            }
        }
    }

    // -- statements ----------------------------------------------------------

    fn parse_block(&mut self) -> PResult<Id<Stmt>> {
        let start = self.expect(&TokenKind::LBrace)?;
        self.allow_struct_lit.push(true);
        let mut stmts = Vec::new();
        while !matches!(self.cur(), TokenKind::RBrace | TokenKind::Eof) {
            match self.parse_stmt() {
                Ok(s) => stmts.push(s),
                Err(Resync) => self.synchronize_stmt(),
            }
        }
        self.allow_struct_lit.pop();
        let end = self.expect(&TokenKind::RBrace)?;
        Ok(self.alloc_stmt(StmtKind::Block(stmts), Span::over(start, end)))
    }

    fn parse_stmt(&mut self) -> PResult<Id<Stmt>> {
        let start = self.cur_span();
        match self.cur() {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Match => self.parse_match(),
            TokenKind::Unsafe => {
                self.tokens.advance();
                let inner = self.parse_block()?;
                Ok(self.alloc_stmt(StmtKind::Unsafe(inner), start))
            }
            TokenKind::Return => {
                self.tokens.advance();
                let value = if matches!(self.cur(), TokenKind::Semi) { None } else { Some(self.parse_expr()?) };
                let end = self.expect(&TokenKind::Semi)?;
                Ok(self.alloc_stmt(StmtKind::Return(value), Span::over(start, end)))
            }
            TokenKind::Break => {
                self.tokens.advance();
                let end = self.expect(&TokenKind::Semi)?;
                Ok(self.alloc_stmt(StmtKind::Break, Span::over(start, end)))
            }
            TokenKind::Continue => {
                self.tokens.advance();
                let end = self.expect(&TokenKind::Semi)?;
                Ok(self.alloc_stmt(StmtKind::Continue, Span::over(start, end)))
            }
            TokenKind::Fallthrough => {
                self.tokens.advance();
                let end = self.expect(&TokenKind::Semi)?;
                Ok(self.alloc_stmt(StmtKind::Fallthrough, Span::over(start, end)))
            }
            TokenKind::Let => self.parse_local_let(start, false),
            TokenKind::Const => self.parse_local_let(start, true),
            _ => self.parse_expr_or_assign_stmt(start),
        }
    }

    fn parse_local_let(&mut self, start: Span, is_const: bool) -> PResult<Id<Stmt>> {
        self.tokens.advance();
        let (name, _) = self.expect_ident()?;
        let ty = if self.eat(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        let value = if self.eat(&TokenKind::Assign) { Some(self.parse_expr()?) } else { None };
        let end = self.expect(&TokenKind::Semi)?;
        let kind = if is_const {
            StmtKind::Const { name, ty, value: value.ok_or(Resync)? }
        } else {
            StmtKind::Let { name, ty, value }
        };
        Ok(self.alloc_stmt(kind, Span::over(start, end)))
    }

    fn parse_cond_no_struct_lit(&mut self) -> PResult<Id<Expr>> {
        self.allow_struct_lit.push(false);
        let expr = self.parse_expr();
        self.allow_struct_lit.pop();
        expr
    }

    fn parse_if(&mut self) -> PResult<Id<Stmt>> {
        let start = self.cur_span();
        self.tokens.advance();
        let cond = self.parse_cond_no_struct_lit()?;
        let then_branch = self.parse_block()?;

        let mut elifs = Vec::new();
        while matches!(self.cur(), TokenKind::Elif) {
            self.tokens.advance();
            let c = self.parse_cond_no_struct_lit()?;
            let b = self.parse_block()?;
            elifs.push((c, b));
        }

        let else_branch = if self.eat(&TokenKind::Else) { Some(self.parse_block()?) } else { None };
        let end = self.cur_span();
        Ok(self.alloc_stmt(StmtKind::If { cond, then_branch, elifs, else_branch }, Span::over(start, end)))
    }

    fn parse_while(&mut self) -> PResult<Id<Stmt>> {
        let start = self.cur_span();
        self.tokens.advance();
        let cond = self.parse_cond_no_struct_lit()?;
        let body = self.parse_block()?;
        let else_branch = if self.eat(&TokenKind::Else) { Some(self.parse_block()?) } else { None };
        let end = self.cur_span();
        Ok(self.alloc_stmt(StmtKind::While { cond, body, else_branch }, Span::over(start, end)))
    }

    fn parse_do_while(&mut self) -> PResult<Id<Stmt>> {
        let start = self.cur_span();
        self.tokens.advance();
        let body = self.parse_block()?;
        self.expect(&TokenKind::While)?;
        let cond = self.parse_expr()?;
        let end = self.expect(&TokenKind::Semi)?;
        Ok(self.alloc_stmt(StmtKind::DoWhile { body, cond }, Span::over(start, end)))
    }

    fn parse_for(&mut self) -> PResult<Id<Stmt>> {
        let start = self.cur_span();
        self.tokens.advance();
        self.expect(&TokenKind::LParen)?;
        self.allow_struct_lit.push(false);

        let init = if matches!(self.cur(), TokenKind::Semi) {
            None
        } else {
            Some(self.parse_for_clause_stmt()?)
        };
        self.expect(&TokenKind::Semi)?;

        let cond = if matches!(self.cur(), TokenKind::Semi) { None } else { Some(self.parse_expr()?) };
        self.expect(&TokenKind::Semi)?;

        let update = if matches!(self.cur(), TokenKind::RParen) {
            None
        } else {
            Some(self.parse_for_clause_stmt()?)
        };
        self.allow_struct_lit.pop();
        self.expect(&TokenKind::RParen)?;

        let body = self.parse_block()?;
        let else_branch = if self.eat(&TokenKind::Else) { Some(self.parse_block()?) } else { None };
        let end = self.cur_span();
        Ok(self.alloc_stmt(StmtKind::For { init, cond, update, body, else_branch }, Span::over(start, end)))
    }

    /// A `for(...)` clause without its terminating `;`, used for the init
    /// and update slots.
    fn parse_for_clause_stmt(&mut self) -> PResult<Id<Stmt>> {
        let start = self.cur_span();
        match self.cur() {
            TokenKind::Let => {
                self.tokens.advance();
                let (name, _) = self.expect_ident()?;
                let ty = if self.eat(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };
                self.expect(&TokenKind::Assign)?;
                let value = Some(self.parse_expr()?);
                Ok(self.alloc_stmt(StmtKind::Let { name, ty, value }, start))
            }
            _ => {
                let expr = self.parse_expr()?;
                self.parse_assign_or_incdec_tail(expr, start)
            }
        }
    }

    fn parse_match(&mut self) -> PResult<Id<Stmt>> {
        let start = self.cur_span();
        self.tokens.advance();
        let scrutinee = self.parse_cond_no_struct_lit()?;
        self.expect(&TokenKind::LBrace)?;
        let mut arms = Vec::new();
        while matches!(self.cur(), TokenKind::Case) {
            self.tokens.advance();
            let mut patterns = vec![self.parse_pattern()?];
            while self.eat(&TokenKind::Pipe) {
                patterns.push(self.parse_pattern()?);
            }
            self.expect(&TokenKind::Colon)?;
            let body = self.parse_block()?;
            arms.push(MatchArm { patterns, body });
        }
        let end = self.expect(&TokenKind::RBrace)?;
        Ok(self.alloc_stmt(StmtKind::Match { scrutinee, arms }, Span::over(start, end)))
    }

    fn parse_pattern(&mut self) -> PResult<Pattern> {
        let span = self.cur_span();
        if let TokenKind::Ident(id) = *self.cur() {
            // A bare identifier not followed by a dotted path is a binding
            // pattern; `Enum.Variant` style selectors parse as literal
            // expressions instead.
            if !matches!(self.tokens.peek(1).map(|t| &t.kind), Some(TokenKind::Dot)) {
                self.tokens.advance();
                return Ok(Pattern { kind: PatternKind::Bind(id), span });
            }
        }
        let expr = self.parse_expr()?;
        Ok(Pattern { kind: PatternKind::Literal(expr), span })
    }

    fn parse_expr_or_assign_stmt(&mut self, start: Span) -> PResult<Id<Stmt>> {
        let expr = self.parse_expr()?;
        self.parse_assign_or_incdec_tail(expr, start)
    }

    fn parse_assign_or_incdec_tail(&mut self, expr: Id<Expr>, start: Span) -> PResult<Id<Stmt>> {
        let op = match self.cur() {
            TokenKind::Assign => Some(AssignOp::Assign),
            TokenKind::PlusAssign => Some(AssignOp::Add),
            TokenKind::MinusAssign => Some(AssignOp::Sub),
            TokenKind::StarAssign => Some(AssignOp::Mul),
            TokenKind::SlashAssign => Some(AssignOp::Div),
            TokenKind::PercentAssign => Some(AssignOp::Mod),
            TokenKind::ShlAssign => Some(AssignOp::Shl),
            TokenKind::ShrAssign => Some(AssignOp::Shr),
            TokenKind::AmpAssign => Some(AssignOp::BitAnd),
            TokenKind::PipeAssign => Some(AssignOp::BitOr),
            TokenKind::CaretAssign => Some(AssignOp::BitXor),
            _ => None,
        };
        if let Some(op) = op {
            self.tokens.advance();
            let value = self.parse_expr()?;
            let end = self.expect(&TokenKind::Semi)?;
            return Ok(self.alloc_stmt(StmtKind::Assign { op, target: expr, value }, Span::over(start, end)));
        }
        if matches!(self.cur(), TokenKind::Inc | TokenKind::Dec) {
            let increment = matches!(self.cur(), TokenKind::Inc);
            self.tokens.advance();
            let end = self.expect(&TokenKind::Semi)?;
            return Ok(self.alloc_stmt(StmtKind::IncDec { target: expr, increment }, Span::over(start, end)));
        }
        let end = self.expect(&TokenKind::Semi)?;
        Ok(self.alloc_stmt(StmtKind::Expr(expr), Span::over(start, end)))
    }

    // -- expressions: Pratt precedence --------------------------------------
    //
    // Loosest to tightest: {&&,||} < {==,!=,<,>,<=,>=} < | < ^ < & <
    // {<<,>>} < {+,-} < {*,/,%} < postfix `as` < unary < primary.

    fn parse_expr(&mut self) -> PResult<Id<Expr>> {
        self.parse_logical()
    }

    fn parse_logical(&mut self) -> PResult<Id<Expr>> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.cur() {
                TokenKind::AmpAmp => BinOp::And,
                TokenKind::PipePipe => BinOp::Or,
                _ => break,
            };
            self.tokens.advance();
            let rhs = self.parse_comparison()?;
            lhs = self.bin(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> PResult<Id<Expr>> {
        let mut lhs = self.parse_bitor()?;
        loop {
            let op = match self.cur() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            self.tokens.advance();
            let rhs = self.parse_bitor()?;
            lhs = self.bin(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> PResult<Id<Expr>> {
        let mut lhs = self.parse_bitxor()?;
        while matches!(self.cur(), TokenKind::Pipe) {
            self.tokens.advance();
            let rhs = self.parse_bitxor()?;
            lhs = self.bin(BinOp::BitOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitxor(&mut self) -> PResult<Id<Expr>> {
        let mut lhs = self.parse_bitand()?;
        while matches!(self.cur(), TokenKind::Caret) {
            self.tokens.advance();
            let rhs = self.parse_bitand()?;
            lhs = self.bin(BinOp::BitXor, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> PResult<Id<Expr>> {
        let mut lhs = self.parse_shift()?;
        while matches!(self.cur(), TokenKind::Amp) {
            self.tokens.advance();
            let rhs = self.parse_shift()?;
            lhs = self.bin(BinOp::BitAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> PResult<Id<Expr>> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.cur() {
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => break,
            };
            self.tokens.advance();
            let rhs = self.parse_additive()?;
            lhs = self.bin(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Id<Expr>> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.cur() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.tokens.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = self.bin(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Id<Expr>> {
        let mut lhs = self.parse_cast()?;
        loop {
            let op = match self.cur() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.tokens.advance();
            let rhs = self.parse_cast()?;
            lhs = self.bin(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn bin(&mut self, op: BinOp, lhs: Id<Expr>, rhs: Id<Expr>) -> Id<Expr> {
        let span = Span::over(self.exprs.get(lhs).span, self.exprs.get(rhs).span);
        self.alloc_expr(ExprKind::Binary(op, lhs, rhs), span)
    }

    fn parse_cast(&mut self) -> PResult<Id<Expr>> {
        let mut expr = self.parse_unary()?;
        while matches!(self.cur(), TokenKind::As) {
            self.tokens.advance();
            let ty = self.parse_type()?;
            let span = self.exprs.get(expr).span;
            expr = self.alloc_expr(ExprKind::Cast { value: expr, ty }, span);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> PResult<Id<Expr>> {
        let start = self.cur_span();
        let op = match self.cur() {
            TokenKind::Amp => Some(UnaryOp::AddressOf),
            TokenKind::Star => Some(UnaryOp::Deref),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.tokens.advance();
            let inner = self.parse_unary()?;
            return Ok(self.alloc_expr(UnaryOp::into(op, inner), start));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Id<Expr>> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.cur() {
                TokenKind::Dot => {
                    self.tokens.advance();
                    let (name, span) = self.expect_ident()?;
                    let full = Span::over(self.exprs.get(expr).span, span);
                    expr = self.alloc_expr(ExprKind::Field(expr, name), full);
                }
                TokenKind::LParen => {
                    self.tokens.advance();
                    let mut args = Vec::new();
                    while !matches!(self.cur(), TokenKind::RParen) {
                        args.push(self.parse_expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    let end = self.expect(&TokenKind::RParen)?;
                    let span = Span::over(self.exprs.get(expr).span, end);
                    expr = self.alloc_expr(ExprKind::Call { callee: expr, args }, span);
                }
                TokenKind::LBracket => {
                    self.tokens.advance();
                    expr = self.parse_index_or_slice(expr)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_index_or_slice(&mut self, base: Id<Expr>) -> PResult<Id<Expr>> {
        if self.eat(&TokenKind::Colon) {
            let hi = if matches!(self.cur(), TokenKind::RBracket) { None } else { Some(self.parse_expr()?) };
            let end = self.expect(&TokenKind::RBracket)?;
            let span = Span::over(self.exprs.get(base).span, end);
            return Ok(self.alloc_expr(ExprKind::Slice { base, lo: None, hi }, span));
        }
        let first = self.parse_expr()?;
        if self.eat(&TokenKind::Colon) {
            let hi = if matches!(self.cur(), TokenKind::RBracket) { None } else { Some(self.parse_expr()?) };
            let end = self.expect(&TokenKind::RBracket)?;
            let span = Span::over(self.exprs.get(base).span, end);
            return Ok(self.alloc_expr(ExprKind::Slice { base, lo: Some(first), hi }, span));
        }
        let end = self.expect(&TokenKind::RBracket)?;
        let span = Span::over(self.exprs.get(base).span, end);
        Ok(self.alloc_expr(ExprKind::Index(base, first), span))
    }

    fn struct_lit_allowed(&self) -> bool {
        *self.allow_struct_lit.last().unwrap_or(&true)
    }

    fn parse_primary(&mut self) -> PResult<Id<Expr>> {
        let start = self.cur_span();
        match self.cur().clone() {
            TokenKind::Ident(id) => {
                self.tokens.advance();
                if self.struct_lit_allowed() && matches!(self.cur(), TokenKind::LBrace) {
                    let ty = self.alloc_type(TypeExprKind::Name(id), start);
                    return self.parse_struct_lit_body(ty, start);
                }
                Ok(self.alloc_expr(ExprKind::Ident(id), start))
            }
            TokenKind::IntLit { text, base } => {
                self.tokens.advance();
                Ok(self.alloc_expr(ExprKind::IntLit { text, base }, start))
            }
            TokenKind::FloatLit(id) => {
                self.tokens.advance();
                Ok(self.alloc_expr(ExprKind::FloatLit(id), start))
            }
            TokenKind::BoolLit(b) => {
                self.tokens.advance();
                Ok(self.alloc_expr(ExprKind::BoolLit(b), start))
            }
            TokenKind::StringLit(id) => {
                self.tokens.advance();
                Ok(self.alloc_expr(ExprKind::StringLit(id), start))
            }
            TokenKind::RuneLit(v) => {
                self.tokens.advance();
                Ok(self.alloc_expr(ExprKind::RuneLit(v), start))
            }
            TokenKind::Null => {
                self.tokens.advance();
                Ok(self.alloc_expr(ExprKind::Null, start))
            }
            TokenKind::LParen => {
                self.tokens.advance();
                self.allow_struct_lit.push(true);
                let inner = self.parse_expr();
                self.allow_struct_lit.pop();
                let inner = inner?;
                let end = self.expect(&TokenKind::RParen)?;
                Ok(self.alloc_expr(ExprKind::Paren(inner), Span::over(start, end)))
            }
            TokenKind::LBracket => {
                self.tokens.advance();
                let mut elems = Vec::new();
                while !matches!(self.cur(), TokenKind::RBracket) {
                    elems.push(self.parse_expr()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let end = self.expect(&TokenKind::RBracket)?;
                Ok(self.alloc_expr(ExprKind::Array(elems), Span::over(start, end)))
            }
            TokenKind::New => {
                self.tokens.advance();
                let ty = self.parse_type()?;
                let size = if self.eat(&TokenKind::LBracket) {
                    let size_expr = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket)?;
                    Some(size_expr)
                } else {
                    None
                };
                let end = self.cur_span();
                Ok(self.alloc_expr(ExprKind::New { ty, size }, Span::over(start, end)))
            }
            // `#sizeof(T)` / `#alignof(T)` (`spec.md` §4.8): a directive
            // token used as a primary-expression macro rather than a
            // top-level `#if`/`#elif`/`#end`/`#require` preprocessor form;
            // both take one type argument in parens.
            TokenKind::Directive(name_id) if matches!(self.table.resolve(name_id), "sizeof" | "alignof") => {
                let is_sizeof = self.table.resolve(name_id) == "sizeof";
                self.tokens.advance();
                self.expect(&TokenKind::LParen)?;
                let ty = self.parse_type()?;
                let end = self.expect(&TokenKind::RParen)?;
                let kind = if is_sizeof { ExprKind::Sizeof(ty) } else { ExprKind::Alignof(ty) };
                Ok(self.alloc_expr(kind, Span::over(start, end)))
            }
            other => {
                self.error(format!("expected an expression but found {}", other.describe()));
                Err(Resync)
            }
        }
    }

    fn parse_struct_lit_body(&mut self, ty: Id<TypeExpr>, start: Span) -> PResult<Id<Expr>> {
        self.expect(&TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !matches!(self.cur(), TokenKind::RBrace) {
            // `name: value` if followed by a colon, else a positional value.
            let name = if let TokenKind::Ident(id) = *self.cur() {
                if matches!(self.tokens.peek(1).map(|t| &t.kind), Some(TokenKind::Colon)) {
                    self.tokens.advance();
                    self.tokens.advance();
                    Some(id)
                } else {
                    None
                }
            } else {
                None
            };
            let value = self.parse_expr()?;
            fields.push(StructLitField { name, value });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBrace)?;
        Ok(self.alloc_expr(ExprKind::StructLit { ty, fields }, Span::over(start, end)))
    }
}

trait IntoUnary {
    fn into(op: UnaryOp, inner: Id<Expr>) -> ExprKind;
}
impl IntoUnary for UnaryOp {
    fn into(op: UnaryOp, inner: Id<Expr>) -> ExprKind {
        ExprKind::Unary(op, inner)
    }
}

/// Canonical source spelling of a primitive-type keyword token, used to
/// intern the same `StringId` a `core`-module lookup of that name would
/// produce (`spec.md` §4.7 point 1: type labels resolve by name regardless
/// of whether the name is a keyword or a plain identifier).
fn primitive_type_name(kind: &TokenKind) -> Option<&'static str> {
    use TokenKind::*;
    Some(match kind {
        I8 => "i8",
        U8 => "u8",
        I16 => "i16",
        U16 => "u16",
        I32 => "i32",
        U32 => "u32",
        I64 => "i64",
        U64 => "u64",
        F32 => "f32",
        F64 => "f64",
        Bool => "bool",
        Unit => "unit",
        StringType => "string",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::WordSize;

    fn parse(src: &str) -> (ParsedFile, CompilerMessages) {
        let mut table = StringTable::new();
        let tokens = crate::tokenizer::lex_source(src, &mut table).unwrap();
        let platform = PlatformDescriptor::new("linux", "x64", WordSize::Bits64);
        let ft = FileTokens::new(crate::module_path::ModulePath::new(), tokens);
        let mut messages = CompilerMessages::new();
        let parser = Parser::new(ft, &mut table, &platform, PathBuf::from("test.bry"), "test".into(), &mut messages);
        (parser.parse_file(), messages)
    }

    #[test]
    fn parses_global_let_and_const() {
        let (file, messages) = parse("let x: i32 = 1;\nconst y = 2;\n");
        assert!(!messages.has_errors());
        assert_eq!(file.decls.len(), 2);
    }

    #[test]
    fn parses_function_with_body() {
        let (file, messages) = parse("func add(a: i32, b: i32): i32 { return a + b; }");
        assert!(!messages.has_errors());
        assert_eq!(file.decls.len(), 1);
        assert!(matches!(file.decls[0].kind, DeclKind::Func { .. }));
    }

    #[test]
    fn parses_struct_and_enum() {
        let (file, messages) = parse("struct Point { x: i32, y: i32 }\nenum Color { Red, Green, Blue }\n");
        assert!(!messages.has_errors());
        assert_eq!(file.decls.len(), 2);
    }

    #[test]
    fn if_condition_disallows_struct_literal() {
        let (file, messages) = parse("func f(): i32 { if x { return 1; } return 0; }");
        assert!(!messages.has_errors());
        assert_eq!(file.decls.len(), 1);
    }

    #[test]
    fn directive_skips_falsy_branch() {
        let (file, messages) = parse("#if(OS == \"windows\")\nfunc only_windows() {}\n#end\nfunc always() {}\n");
        assert!(!messages.has_errors());
        assert_eq!(file.decls.len(), 1);
    }
}
