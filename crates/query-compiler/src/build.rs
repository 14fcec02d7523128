//! A type-safe fluent builder for `Select` ASTs.
//!
//! The typestate markers force clauses into SQL order at compile time:
//! `SELECT` first, then `FROM`, then any of the optional clauses.

use crate::ast::{
    common::{JoinKind, OrderDir, TableRef},
    expr::Expr,
    select::{FromClause, JoinClause, OrderByExpr, Select},
};

#[derive(Debug, Default, Clone)]
pub struct InitialState;

#[derive(Debug, Default, Clone)]
pub struct SelectState;

#[derive(Debug, Default, Clone)]
pub struct FromState;

#[derive(Debug, Clone)]
pub struct SelectBuilder<State> {
    ast: Select,
    state: State,
}

impl Default for SelectBuilder<InitialState> {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectBuilder<InitialState> {
    pub fn new() -> Self {
        Self {
            ast: Select::default(),
            state: InitialState,
        }
    }

    /// The entry point: sets the projected columns.
    pub fn select(mut self, columns: Vec<Expr>) -> SelectBuilder<SelectState> {
        self.ast.columns = columns;
        SelectBuilder {
            ast: self.ast,
            state: SelectState,
        }
    }
}

impl SelectBuilder<SelectState> {
    pub fn from(mut self, table: TableRef, alias: Option<&str>) -> SelectBuilder<FromState> {
        self.ast.from = Some(FromClause {
            table,
            alias: alias.map(String::from),
        });
        SelectBuilder {
            ast: self.ast,
            state: FromState,
        }
    }
}

impl SelectBuilder<FromState> {
    pub fn join(mut self, kind: JoinKind, table: TableRef, alias: Option<&str>, on: Expr) -> Self {
        self.ast.joins.push(JoinClause {
            kind,
            table,
            alias: alias.map(String::from),
            on,
        });
        self
    }

    pub fn where_clause(mut self, condition: Expr) -> Self {
        self.ast.where_clause = Some(condition);
        self
    }

    pub fn order_by(mut self, expr: Expr, direction: Option<OrderDir>) -> Self {
        self.ast.order_by.push(OrderByExpr { expr, direction });
        self
    }

    pub fn limit(mut self, limit: Expr) -> Self {
        self.ast.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: Expr) -> Self {
        self.ast.offset = Some(offset);
        self
    }

    pub fn build(self) -> Select {
        self.ast
    }
}
