//! Defines the AST for SQL expressions.

use model::core::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column or table identifier, e.g., `users` or `users.id`.
    Identifier(Ident),

    /// A literal value bound as a statement parameter.
    Value(Value),

    /// A binary operation, e.g., `column = 'value'` or `a AND b`.
    BinaryOp(Box<BinaryOp>),

    /// A set membership test, e.g., `name IN ($1, $2)`.
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },

    /// A null test, e.g., `deleted_at IS NULL`.
    IsNull { expr: Box<Expr>, negated: bool },

    /// A boolean constant, `TRUE` or `FALSE`. Consumes no placeholder.
    Constant(bool),

    /// A qualified wildcard, e.g. `"t0_users".*`
    Wildcard { qualifier: Option<String> },

    /// An aliased expression, e.g. `"t0_users"."id" AS "id"`
    Alias { expr: Box<Expr>, alias: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub qualifier: Option<String>, // e.g., the 't0_users' in 't0_users.id'
    pub name: String,              // e.g., the 'id' in 't0_users.id'
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub left: Expr,
    pub op: BinaryOperator,
    pub right: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,    // =
    NotEq, // <>
    Lt,    // <
    LtEq,  // <=
    Gt,    // >
    GtEq,  // >=

    // Pattern matching
    Like,
    ILike,
    NotLike,
    NotILike,

    // Logical
    And,
    Or,
}
