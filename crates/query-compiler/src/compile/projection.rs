//! Compiles select paths and order items into resolved columns.

use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    ast::common::OrderDir,
    error::QueryError,
    input::OrderItem,
    normalize::Projection,
    plan::JoinPlan,
    schema::{FieldDef, Schema},
};

/// A projected column: the table alias and column it reads, plus the output
/// name the caller asked for (the full dotted path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectColumn {
    pub alias: String,
    pub column: String,
    pub output: String,
}

/// A resolved order term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderColumn {
    pub alias: String,
    pub column: String,
    pub direction: OrderDir,
}

/// Resolves the select list, or `None` for a root-table wildcard.
pub fn compile_select(
    schema: &Arc<Schema>,
    plan: &JoinPlan,
    select: &Projection,
) -> Result<Option<Vec<SelectColumn>>, QueryError> {
    let Projection::Fields(fields) = select else {
        return Ok(None);
    };

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(fields.len());
    for path in fields {
        if !seen.insert(path.as_str()) {
            return Err(QueryError::DuplicateSelectField { path: path.clone() });
        }
        let (alias, column) = resolve_path(schema, plan, path)?;
        columns.push(SelectColumn {
            alias,
            column,
            output: path.clone(),
        });
    }
    Ok(Some(columns))
}

pub fn compile_order(
    schema: &Arc<Schema>,
    plan: &JoinPlan,
    order: &[OrderItem],
) -> Result<Vec<OrderColumn>, QueryError> {
    order
        .iter()
        .map(|item| {
            let (alias, column) = resolve_path(schema, plan, &item.path)?;
            Ok(OrderColumn {
                alias,
                column,
                direction: item.direction,
            })
        })
        .collect()
}

/// Resolves a dotted path to the alias and column it reads. A path ending on
/// a relation resolves to the relation's own column on the source table.
fn resolve_path(
    schema: &Arc<Schema>,
    plan: &JoinPlan,
    path: &str,
) -> Result<(String, String), QueryError> {
    let mut schema = Arc::clone(schema);
    let mut alias = plan.root_alias().to_string();

    let segments: Vec<&str> = path.split('.').collect();
    for segment in &segments[..segments.len() - 1] {
        let entry = plan
            .lookup(&alias, segment)
            .ok_or_else(|| QueryError::UnknownField {
                path: path.to_string(),
            })?;
        alias = entry.alias.clone();
        schema = Arc::clone(&entry.target);
    }

    match schema.get_field(segments[segments.len() - 1]) {
        Some(FieldDef::Column(column)) => Ok((alias, column.clone())),
        Some(FieldDef::Relation(relation)) => Ok((alias, relation.column().to_string())),
        None => Err(QueryError::UnknownField {
            path: path.to_string(),
        }),
    }
}
