//! Compiles a filter tree into a WHERE expression.
//!
//! Sibling entries are ANDed, `$or` branches are ORed, and nested trees are
//! compiled against the alias their relation received in the join plan.
//! Every literal ends up as a bound parameter; the only inlined tokens are
//! the TRUE/FALSE constants for empty membership lists.

use std::sync::Arc;

use model::core::value::Value;

use crate::{
    ast::expr::{BinaryOp, BinaryOperator, Expr, Ident},
    error::QueryError,
    input::{FieldCondition, FilterEntry, FilterTree, Operator},
    plan::{join_path, JoinPlan},
    schema::{FieldDef, Schema},
};

pub fn compile_where(
    schema: &Arc<Schema>,
    plan: &JoinPlan,
    tree: &FilterTree,
) -> Result<Option<Expr>, QueryError> {
    compile_tree(schema, plan, plan.root_alias(), "", tree)
}

fn compile_tree(
    schema: &Arc<Schema>,
    plan: &JoinPlan,
    alias: &str,
    prefix: &str,
    tree: &FilterTree,
) -> Result<Option<Expr>, QueryError> {
    let mut parts = Vec::new();
    for entry in &tree.entries {
        match entry {
            FilterEntry::And(branches) => {
                for branch in branches {
                    if let Some(expr) = compile_tree(schema, plan, alias, prefix, branch)? {
                        parts.push(expr);
                    }
                }
            }
            FilterEntry::Or(branches) => {
                let mut alternatives = Vec::new();
                for branch in branches {
                    if let Some(expr) = compile_tree(schema, plan, alias, prefix, branch)? {
                        alternatives.push(expr);
                    }
                }
                if let Some(expr) = combine(alternatives, BinaryOperator::Or) {
                    parts.push(expr);
                }
            }
            FilterEntry::Field { path, condition } => {
                if let Some(expr) = compile_field(schema, plan, alias, prefix, path, condition)? {
                    parts.push(expr);
                }
            }
        }
    }
    Ok(combine(parts, BinaryOperator::And))
}

fn compile_field(
    schema: &Arc<Schema>,
    plan: &JoinPlan,
    alias: &str,
    prefix: &str,
    path: &str,
    condition: &FieldCondition,
) -> Result<Option<Expr>, QueryError> {
    let mut schema = Arc::clone(schema);
    let mut alias = alias.to_string();
    let mut walked = prefix.to_string();

    let segments: Vec<&str> = path.split('.').collect();
    for segment in &segments[..segments.len() - 1] {
        let full = join_path(&walked, segment);
        let entry = plan
            .lookup(&alias, segment)
            .ok_or_else(|| QueryError::UnknownField { path: full.clone() })?;
        alias = entry.alias.clone();
        schema = Arc::clone(&entry.target);
        walked = full;
    }

    let segment = segments[segments.len() - 1];
    let full = join_path(&walked, segment);
    match schema.get_field(segment) {
        None => Err(QueryError::UnknownField { path: full }),
        Some(FieldDef::Column(column)) => compile_condition(&alias, column, &full, condition),
        Some(FieldDef::Relation(relation)) => match condition {
            FieldCondition::Nested(tree) => {
                let entry =
                    plan.lookup(&alias, segment)
                        .ok_or_else(|| QueryError::UnknownField { path: full.clone() })?;
                compile_tree(
                    &Arc::clone(&entry.target),
                    plan,
                    &entry.alias.clone(),
                    &full,
                    tree,
                )
            }
            // Compared as a plain value against the relation's own column.
            _ => compile_condition(&alias, relation.column(), &full, condition),
        },
    }
}

fn compile_condition(
    alias: &str,
    column: &str,
    field: &str,
    condition: &FieldCondition,
) -> Result<Option<Expr>, QueryError> {
    match condition {
        FieldCondition::Literal(value) => Ok(Some(binary(
            qualified(alias, column),
            BinaryOperator::Eq,
            Expr::Value(value.clone()),
        ))),
        FieldCondition::Ops(ops) => {
            let mut parts = Vec::with_capacity(ops.len());
            for (op, value) in ops {
                parts.push(compile_op(qualified(alias, column), field, *op, value)?);
            }
            Ok(combine(parts, BinaryOperator::And))
        }
        FieldCondition::Nested(_) => Err(QueryError::InvalidFilter {
            field: field.to_string(),
            reason: "field does not support nested filters".to_string(),
        }),
    }
}

fn compile_op(
    target: Expr,
    field: &str,
    op: Operator,
    value: &Value,
) -> Result<Expr, QueryError> {
    op.validate(field, value)?;
    let expr = match op {
        Operator::Eq => binary(target, BinaryOperator::Eq, Expr::Value(value.clone())),
        Operator::NotEq => binary(target, BinaryOperator::NotEq, Expr::Value(value.clone())),
        Operator::Gt => binary(target, BinaryOperator::Gt, Expr::Value(value.clone())),
        Operator::Gte => binary(target, BinaryOperator::GtEq, Expr::Value(value.clone())),
        Operator::Lt => binary(target, BinaryOperator::Lt, Expr::Value(value.clone())),
        Operator::Lte => binary(target, BinaryOperator::LtEq, Expr::Value(value.clone())),
        Operator::Like => binary(target, BinaryOperator::Like, Expr::Value(value.clone())),
        Operator::ILike => binary(target, BinaryOperator::ILike, Expr::Value(value.clone())),
        Operator::NotLike => binary(target, BinaryOperator::NotLike, Expr::Value(value.clone())),
        Operator::NotILike => {
            binary(target, BinaryOperator::NotILike, Expr::Value(value.clone()))
        }
        Operator::In | Operator::NotIn => {
            let negated = op == Operator::NotIn;
            let items = match value {
                Value::Array(items) => items,
                // validate() only admits arrays here
                _ => return Ok(Expr::Constant(negated)),
            };
            if items.is_empty() {
                // IN () matches nothing, NOT IN () matches everything.
                Expr::Constant(negated)
            } else {
                Expr::InList {
                    expr: Box::new(target),
                    list: items.iter().cloned().map(Expr::Value).collect(),
                    negated,
                }
            }
        }
        Operator::Is => Expr::IsNull {
            expr: Box::new(target),
            negated: false,
        },
        Operator::IsNot => Expr::IsNull {
            expr: Box::new(target),
            negated: true,
        },
    };
    Ok(expr)
}

pub(crate) fn qualified(alias: &str, column: &str) -> Expr {
    Expr::Identifier(Ident {
        qualifier: Some(alias.to_string()),
        name: column.to_string(),
    })
}

pub(crate) fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    Expr::BinaryOp(Box::new(BinaryOp { left, op, right }))
}

pub(crate) fn combine(exprs: Vec<Expr>, op: BinaryOperator) -> Option<Expr> {
    let mut iter = exprs.into_iter();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, expr| binary(acc, op, expr)))
}

#[cfg(test)]
mod tests {
    use crate::{
        dialect::Postgres,
        input::{FilterTree, OrderItem},
        normalize::{Projection, QueryDescriptor},
        pagination::Pagination,
        plan::plan_joins,
        render::{Render, Renderer},
        schema::{Relation, Schema, SchemaRef},
    };
    use serde_json::json;

    use super::*;

    fn catalog() -> Arc<Schema> {
        let translations = Schema::builder("translations")
            .column("entityId", "entity_id")
            .column("value", "value")
            .build();
        Schema::builder("products")
            .column("id", "id")
            .column("price", "price")
            .relation(
                "translation",
                Relation::new("id", SchemaRef::to(&translations), "entityId"),
            )
            .build()
    }

    fn render_where(schema: &Arc<Schema>, filter: serde_json::Value) -> (String, Vec<Value>) {
        let tree = FilterTree::from_json(filter).unwrap();
        let desc = QueryDescriptor {
            filter: tree.clone(),
            order: Vec::<OrderItem>::new(),
            select: Projection::AllFields,
            page: Pagination {
                limit: 20,
                offset: 0,
            },
        };
        let plan = plan_joins(schema, &desc, 5).unwrap();
        let expr = compile_where(schema, &plan, &tree).unwrap().unwrap();

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        expr.render(&mut renderer);
        renderer.finish()
    }

    #[test]
    fn test_range_condition_is_anded() {
        let schema = catalog();
        let (sql, params) = render_where(&schema, json!({ "price": { "$gte": 10, "$lte": 50 } }));
        assert_eq!(
            sql,
            r#"(("t0_products"."price" >= $1) AND ("t0_products"."price" <= $2))"#
        );
        assert_eq!(params, vec![Value::Int(10), Value::Int(50)]);
    }

    #[test]
    fn test_or_branches() {
        let schema = catalog();
        let (sql, params) = render_where(
            &schema,
            json!({ "$or": [{ "price": 1 }, { "price": 2 }] }),
        );
        assert_eq!(
            sql,
            r#"(("t0_products"."price" = $1) OR ("t0_products"."price" = $2))"#
        );
        assert_eq!(params, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_empty_membership_lists_become_constants() {
        let schema = catalog();
        let (sql, params) = render_where(&schema, json!({ "id": { "$in": [] } }));
        assert_eq!(sql, "FALSE");
        assert!(params.is_empty());

        let (sql, _) = render_where(&schema, json!({ "id": { "$notIn": [] } }));
        assert_eq!(sql, "TRUE");
    }

    #[test]
    fn test_nested_filter_uses_the_joined_alias() {
        let schema = catalog();
        let (sql, params) = render_where(
            &schema,
            json!({ "translation": { "value": { "$iLike": "%phone%" } } }),
        );
        assert_eq!(sql, r#"("t1_translations"."value" ILIKE $1)"#);
        assert_eq!(params, vec![Value::String("%phone%".to_string())]);
    }

    #[test]
    fn test_plain_condition_on_a_relation_stays_on_the_source() {
        let schema = catalog();
        let (sql, params) = render_where(&schema, json!({ "translation": 7 }));
        assert_eq!(sql, r#"("t0_products"."id" = $1)"#);
        assert_eq!(params, vec![Value::Int(7)]);
    }

    #[test]
    fn test_null_tests() {
        let schema = catalog();
        let (sql, params) = render_where(&schema, json!({ "price": { "$is": null } }));
        assert_eq!(sql, r#""t0_products"."price" IS NULL"#);
        assert!(params.is_empty());
    }

    #[test]
    fn test_unknown_nested_field_reports_the_full_path() {
        let schema = catalog();
        let planned = FilterTree::from_json(json!({ "translation": { "value": "x" } })).unwrap();
        let desc = QueryDescriptor {
            filter: planned,
            order: vec![],
            select: Projection::AllFields,
            page: Pagination {
                limit: 20,
                offset: 0,
            },
        };
        let plan = plan_joins(&schema, &desc, 5).unwrap();

        let tree = FilterTree::from_json(json!({ "translation": { "missing": 1 } })).unwrap();
        let err = compile_where(&schema, &plan, &tree).unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownField {
                path: "translation.missing".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_operand_is_rejected() {
        let schema = catalog();
        let tree = FilterTree::from_json(json!({ "price": { "$like": 5 } })).unwrap();
        let desc = QueryDescriptor {
            filter: tree.clone(),
            order: vec![],
            select: Projection::AllFields,
            page: Pagination {
                limit: 20,
                offset: 0,
            },
        };
        let plan = plan_joins(&schema, &desc, 5).unwrap();
        let err = compile_where(&schema, &plan, &tree).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter { ref field, .. } if field == "price"));
    }
}
