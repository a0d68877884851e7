//! AST types produced by the SPARQL parser (component E).
//!
//! Mirrors the original's tagged-union node shapes as plain Rust enums with
//! owned fields; `Expr`/`Pattern` subtrees are exclusively owned top-down
//! (no cycles, no shared ownership needed — see the Design Notes).

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Unbound,
    Resource(String),
    Literal { lexical: String, datatype: Option<String> },
    Variable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quad {
    pub graph: Node,
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    pub mandatory_quads: Vec<Quad>,
    pub optional: Vec<Pattern>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Mult(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Plus(Box<Expr>, Box<Expr>),
    Min(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Inv(Box<Expr>),
    Equal(Box<Expr>, Box<Expr>),
    NotEqual(Box<Expr>, Box<Expr>),
    Greater(Box<Expr>, Box<Expr>),
    GreaterEqual(Box<Expr>, Box<Expr>),
    Less(Box<Expr>, Box<Expr>),
    LessEqual(Box<Expr>, Box<Expr>),
    Value(Node),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderCond {
    pub desc: bool,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub distinct: bool,
    pub projection: Vec<String>,
    pub pattern: Pattern,
    pub order: Vec<OrderCond>,
    pub limit: i64,
    pub offset: i64,
}
