//! AST node shapes produced by the parser, arena-indexed the same way as
//! every other phase's intermediate data (`crate::arena`).
//!
//! Grounded on the shape of the teacher's `ast_nodes.rs` (`AstNode { kind,
//! location, scope }`, a flat `NodeKind` enum with variant-per-construct),
//! generalized from Beanstalk's template/scene nodes to `spec.md` §4.3's
//! expression/statement/declaration grammar.

use crate::arena::Id;
use crate::string_interning::StringId;
use crate::tokenizer::tokens::{NumberBase, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Deref,
    AddressOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone)]
pub struct StructLitField {
    /// `None` for positional initializers (`T{1, 2}`).
    pub name: Option<StringId>,
    pub value: Id<Expr>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Ident(StringId),
    IntLit { text: StringId, base: NumberBase },
    FloatLit(StringId),
    BoolLit(bool),
    StringLit(StringId),
    RuneLit(i32),
    Null,

    Paren(Id<Expr>),
    Array(Vec<Id<Expr>>),
    /// `new T` (size = None) or `new T[size]` (heap array).
    New { ty: Id<TypeExpr>, size: Option<Id<Expr>> },
    StructLit { ty: Id<TypeExpr>, fields: Vec<StructLitField> },

    Field(Id<Expr>, StringId),
    Index(Id<Expr>, Id<Expr>),
    /// `e[lo:hi]`, either bound optional.
    Slice { base: Id<Expr>, lo: Option<Id<Expr>>, hi: Option<Id<Expr>> },
    Call { callee: Id<Expr>, args: Vec<Id<Expr>> },

    Unary(UnaryOp, Id<Expr>),
    Binary(BinOp, Id<Expr>, Id<Expr>),
    Cast { value: Id<Expr>, ty: Id<TypeExpr> },

    /// `#sizeof(T)` / `#alignof(T)` (`spec.md` §4.8, §6): resolved against
    /// the `TargetPlatform` oracle, not computed structurally here.
    Sizeof(Id<TypeExpr>),
    Alignof(Id<TypeExpr>),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// A type annotation as written in source, resolved to a `types::Type` by
/// the checker once declaration ordering is known.
#[derive(Debug, Clone)]
pub enum TypeExprKind {
    /// A single identifier: a primitive keyword or a local/imported name.
    Name(StringId),
    /// A dotted selector naming a type in another module (`mod.Name`).
    Path(Vec<StringId>),
    Pointer(Id<TypeExpr>),
    Array { elem: Id<TypeExpr>, len: Id<Expr> },
    Slice(Id<TypeExpr>),
    Func { params: Vec<Id<TypeExpr>>, ret: Option<Id<TypeExpr>> },
}

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    Literal(Id<Expr>),
    /// Binds the scrutinee to a fresh local. Never appears inside an
    /// alternation (`spec.md` §4.7: "alternated patterns must not bind").
    Bind(StringId),
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MatchArm {
    /// One or more alternated patterns (`p1 | p2`).
    pub patterns: Vec<Pattern>,
    pub body: Id<Stmt>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(Id<Expr>),
    Let { name: StringId, ty: Option<Id<TypeExpr>>, value: Option<Id<Expr>> },
    Const { name: StringId, ty: Option<Id<TypeExpr>>, value: Id<Expr> },
    Assign { op: AssignOp, target: Id<Expr>, value: Id<Expr> },
    IncDec { target: Id<Expr>, increment: bool },
    Block(Vec<Id<Stmt>>),
    If {
        cond: Id<Expr>,
        then_branch: Id<Stmt>,
        elifs: Vec<(Id<Expr>, Id<Stmt>)>,
        else_branch: Option<Id<Stmt>>,
    },
    While { cond: Id<Expr>, body: Id<Stmt>, else_branch: Option<Id<Stmt>> },
    DoWhile { body: Id<Stmt>, cond: Id<Expr> },
    For {
        init: Option<Id<Stmt>>,
        cond: Option<Id<Expr>>,
        update: Option<Id<Stmt>>,
        body: Id<Stmt>,
        else_branch: Option<Id<Stmt>>,
    },
    Match { scrutinee: Id<Expr>, arms: Vec<MatchArm> },
    Unsafe(Id<Stmt>),
    Return(Option<Id<Expr>>),
    Break,
    Continue,
    Fallthrough,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// A parsed `@name` / `@name("value")` attribute. Bracketed lists
/// (`@[a, b(v)]`) desugar to multiple `Attribute`s during parsing.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: StringId,
    pub name_span: Span,
    pub value: Option<StringId>,
    pub value_span: Option<Span>,
}

pub type AttributeList = Vec<Attribute>;

#[derive(Debug, Clone)]
pub struct Param {
    pub name: StringId,
    pub ty: Id<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructFieldDecl {
    pub name: StringId,
    pub ty: Id<TypeExpr>,
    pub exported: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Func {
        /// `Some` when declared as `func (T) name(...)`, i.e. a method.
        receiver: Option<Id<TypeExpr>>,
        /// `Some` when declared as `factory T name(...)`.
        factory_of: Option<Id<TypeExpr>>,
        params: Vec<Param>,
        ret: Option<Id<TypeExpr>>,
        body: Option<Id<Stmt>>,
    },
    Global {
        is_const: bool,
        ty: Option<Id<TypeExpr>>,
        value: Option<Id<Expr>>,
    },
    Struct {
        fields: Vec<StructFieldDecl>,
    },
    Alias {
        ty: Id<TypeExpr>,
    },
    Enum {
        variants: Vec<(StringId, Option<Id<Expr>>)>,
    },
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub name: StringId,
    pub kind: DeclKind,
    pub attrs: AttributeList,
    pub exported: bool,
    pub span: Span,
}

/// `module X;` / `import a.b.c [as alias];` headers, parsed ahead of the
/// declaration body per `spec.md` §4.4, step 1.
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub path: Vec<StringId>,
    pub alias: Option<StringId>,
    pub span: Span,
}

/// A fully parsed source file: optional `module` header, import list, and
/// top-level declarations, plus the arenas their nodes live in.
#[derive(Debug)]
pub struct ParsedFile {
    pub module_name: Option<StringId>,
    pub imports: Vec<ImportDecl>,
    pub decls: Vec<Decl>,
    pub exprs: crate::arena::Arena<Expr>,
    pub stmts: crate::arena::Arena<Stmt>,
    pub type_exprs: crate::arena::Arena<TypeExpr>,
}
