//! The compilation pipeline: normalize, plan joins, compile clauses,
//! assemble and render one parameterized SELECT.

pub mod filter;
pub mod projection;

use std::sync::Arc;

use model::core::value::Value;
use tracing::debug;

use crate::{
    ast::{
        common::TableRef,
        expr::{BinaryOperator, Expr, Ident},
    },
    build::SelectBuilder,
    config::CompilerConfig,
    dialect::Postgres,
    error::QueryError,
    input::QueryInput,
    normalize,
    plan::{plan_joins, JoinEntry},
    render::{Render, Renderer},
    schema::Schema,
};

use self::filter::{binary, combine, qualified};

/// A finished statement: SQL text with positional placeholders and the
/// parameters bound to them, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Compiles one query description against a schema into a SELECT statement.
///
/// Parameters are bound in a fixed order: WHERE literals in filter entry
/// order, then the limit, then the offset. The same schema, input and
/// configuration always produce byte-identical output.
pub fn compile(
    schema: &Arc<Schema>,
    input: &QueryInput,
    config: &CompilerConfig,
) -> Result<Statement, QueryError> {
    let desc = normalize::normalize(schema, input, config)?;
    let plan = plan_joins(schema, &desc, config.max_join_depth)?;
    debug!(
        root = plan.root_alias(),
        joins = plan.entries().len(),
        "join plan ready"
    );

    let where_clause = filter::compile_where(schema, &plan, &desc.filter)?;
    let order = projection::compile_order(schema, &plan, &desc.order)?;
    let select = projection::compile_select(schema, &plan, &desc.select)?;

    let columns = match select {
        None => vec![Expr::Wildcard {
            qualifier: Some(plan.root_alias().to_string()),
        }],
        Some(columns) => columns
            .into_iter()
            .map(|col| Expr::Alias {
                expr: Box::new(qualified(&col.alias, &col.column)),
                alias: col.output,
            })
            .collect(),
    };

    let mut builder = SelectBuilder::new().select(columns).from(
        TableRef {
            schema: None,
            name: schema.table().to_string(),
        },
        Some(plan.root_alias()),
    );
    for entry in plan.entries() {
        builder = builder.join(
            entry.kind,
            TableRef {
                schema: None,
                name: entry.table.clone(),
            },
            Some(&entry.alias),
            join_condition(entry),
        );
    }
    if let Some(expr) = where_clause {
        builder = builder.where_clause(expr);
    }
    for term in order {
        builder = builder.order_by(
            Expr::Identifier(Ident {
                qualifier: Some(term.alias),
                name: term.column,
            }),
            Some(term.direction),
        );
    }
    let ast = builder
        .limit(Expr::Value(Value::Int(desc.page.limit)))
        .offset(Expr::Value(Value::Int(desc.page.offset)))
        .build();

    let dialect = Postgres;
    let mut renderer = Renderer::new(&dialect);
    ast.render(&mut renderer);
    let (sql, params) = renderer.finish();
    debug!(%sql, params = params.len(), "compiled statement");
    Ok(Statement { sql, params })
}

/// ANDs the equal-column pairs of a planned join into its ON condition.
fn join_condition(entry: &JoinEntry) -> Expr {
    let pairs = entry
        .pairs
        .iter()
        .map(|(source, target)| {
            binary(
                qualified(&entry.source_alias, source),
                BinaryOperator::Eq,
                qualified(&entry.alias, target),
            )
        })
        .collect();
    // a join always has at least its primary column pair
    combine(pairs, BinaryOperator::And).unwrap_or(Expr::Constant(true))
}
