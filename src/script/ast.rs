//! Syntax tree for `put`/`filter` expressions.

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Times,
    Divide,
    IntDivide,
    Modulus,
    Power,
    Dot,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Matches,
    NotMatches,
    And,
    Or,
    Xor,
    AbsentCoalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextVar {
    Nr,
    Fnr,
    Filename,
    Filenum,
    Pi,
    E,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Field(String),
    /// `$*`, the current record as a map.
    FullRecord,
    Oosvar(String),
    AllOosvars,
    Context(ContextVar),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    MapLiteral(Vec<(Expr, Expr)>),
    ArrayLiteral(Vec<Expr>),
}

/// Something that can be assigned to or unset.
#[derive(Debug, Clone)]
pub enum LValue {
    Field(String),
    FullRecord,
    Oosvar(String, Vec<Expr>),
    AllOosvars,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Assign(LValue, Expr),
    Unset(Vec<LValue>),
    Filter(Expr),
    /// A bare boolean expression; `filter` uses the last one as its condition.
    Bare(Expr),
    Print(Vec<Expr>),
    If(Vec<(Expr, Vec<Statement>)>, Option<Vec<Statement>>),
    /// `condition { ... }`
    Pattern(Expr, Vec<Statement>),
    /// `emit @name` or `emit @name, "k1", "k2"`.
    Emit(LValue, Vec<Expr>),
    /// `dump` prints all oosvars as JSON; `dump @x` prints one.
    Dump(Option<Expr>),
}

/// A parsed program: `begin` blocks, main statements, `end` blocks.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub begin: Vec<Vec<Statement>>,
    pub main: Vec<Statement>,
    pub end: Vec<Vec<Statement>>,
}
