//! Compiles nested, schema-validated filter descriptions into parameterized
//! PostgreSQL SELECT statements.
//!
//! The pipeline: [`normalize`] canonicalizes caller input, [`plan`] collects
//! the joins the query needs, [`compile`] turns the pieces into a SQL AST and
//! [`render`] emits the final text with `$n` placeholders. [`fluent`] wraps
//! it all behind reusable per-endpoint definitions.

pub mod ast;
pub mod build;
pub mod compile;
pub mod config;
pub mod dialect;
pub mod error;
pub mod fluent;
pub mod input;
pub mod macros;
pub mod normalize;
pub mod pagination;
pub mod plan;
pub mod render;
pub mod schema;

use crate::ast::expr::{Expr, Ident};
use model::core::value::Value;

pub use crate::compile::{compile, Statement};
pub use crate::config::{CompilerConfig, LimitPolicy};
pub use crate::error::QueryError;
pub use crate::fluent::QueryDef;
pub use crate::input::{FilterTree, QueryInput};
pub use crate::schema::{Relation, Schema, SchemaRef};

pub fn ident(name: &str) -> Expr {
    Expr::Identifier(Ident {
        qualifier: None,
        name: name.to_string(),
    })
}

pub fn value(val: Value) -> Expr {
    Expr::Value(val)
}
