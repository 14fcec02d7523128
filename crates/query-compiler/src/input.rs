//! Caller-facing query description: filter tree, order, select and paging.
//!
//! The filter syntax mirrors the JSON shape callers send over the wire:
//! field names map to conditions, `$`-prefixed keys are operators or the
//! `$and`/`$or` combinators, and plain nested objects descend into relations.
//! Entry order is preserved end to end so the emitted SQL is deterministic.

use model::core::value::Value;
use serde::Deserialize;

use crate::{ast::common::OrderDir, error::QueryError};

/// Longest accepted pattern for the LIKE operator family.
pub const MAX_PATTERN_LEN: usize = 1000;

/// A comparison operator inside a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Like,
    ILike,
    NotLike,
    NotILike,
    Is,
    IsNot,
}

impl Operator {
    /// Parses a `$`-prefixed operator key, case-insensitively.
    pub fn parse(key: &str) -> Option<Operator> {
        let op = match key.to_ascii_lowercase().as_str() {
            "$eq" => Operator::Eq,
            "$neq" | "$noteq" => Operator::NotEq,
            "$gt" => Operator::Gt,
            "$gte" => Operator::Gte,
            "$lt" => Operator::Lt,
            "$lte" => Operator::Lte,
            "$in" => Operator::In,
            "$notin" | "$nin" => Operator::NotIn,
            "$like" => Operator::Like,
            "$ilike" => Operator::ILike,
            "$notlike" | "$nlike" => Operator::NotLike,
            "$notilike" | "$nilike" => Operator::NotILike,
            "$is" => Operator::Is,
            "$isnot" => Operator::IsNot,
            _ => return None,
        };
        Some(op)
    }

    /// Checks that `value` is an acceptable operand for this operator.
    pub fn validate(&self, field: &str, value: &Value) -> Result<(), QueryError> {
        match self {
            Operator::In | Operator::NotIn => {
                if !matches!(value, Value::Array(_)) {
                    return Err(QueryError::InvalidFilter {
                        field: field.to_string(),
                        reason: "operator requires an array of values".to_string(),
                    });
                }
            }
            Operator::Like | Operator::ILike | Operator::NotLike | Operator::NotILike => {
                let Some(pattern) = value.as_str() else {
                    return Err(QueryError::InvalidFilter {
                        field: field.to_string(),
                        reason: "operator requires a string pattern".to_string(),
                    });
                };
                if pattern.len() > MAX_PATTERN_LEN {
                    return Err(QueryError::InvalidFilter {
                        field: field.to_string(),
                        reason: "pattern is too long".to_string(),
                    });
                }
            }
            Operator::Is | Operator::IsNot => {
                if !value.is_null() {
                    return Err(QueryError::InvalidFilter {
                        field: field.to_string(),
                        reason: "operator only accepts null".to_string(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// The condition attached to one field entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    /// A bare value, compiled as equality.
    Literal(Value),
    /// One or more operator comparisons, applied in entry order.
    Ops(Vec<(Operator, Value)>),
    /// A nested tree scoped to the field's relation target.
    Nested(FilterTree),
}

impl FieldCondition {
    pub fn eq(value: impl Into<Value>) -> Self {
        FieldCondition::Literal(value.into())
    }

    pub fn op(operator: Operator, value: impl Into<Value>) -> Self {
        FieldCondition::Ops(vec![(operator, value.into())])
    }

    pub fn ops(ops: Vec<(Operator, Value)>) -> Self {
        FieldCondition::Ops(ops)
    }

    pub fn nested(tree: FilterTree) -> Self {
        FieldCondition::Nested(tree)
    }
}

/// One entry of a filter tree, in the order the caller wrote it.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEntry {
    And(Vec<FilterTree>),
    Or(Vec<FilterTree>),
    Field {
        path: String,
        condition: FieldCondition,
    },
}

/// An ordered conjunction of filter entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterTree {
    pub entries: Vec<FilterEntry>,
}

impl FilterTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn field(mut self, path: &str, condition: FieldCondition) -> Self {
        self.entries.push(FilterEntry::Field {
            path: path.to_string(),
            condition,
        });
        self
    }

    pub fn and(mut self, branches: Vec<FilterTree>) -> Self {
        self.entries.push(FilterEntry::And(branches));
        self
    }

    pub fn or(mut self, branches: Vec<FilterTree>) -> Self {
        self.entries.push(FilterEntry::Or(branches));
        self
    }

    /// Builds a tree from the wire JSON shape.
    pub fn from_json(json: serde_json::Value) -> Result<FilterTree, QueryError> {
        let serde_json::Value::Object(map) = json else {
            return Err(QueryError::InvalidFilter {
                field: "$root".to_string(),
                reason: "filter must be an object".to_string(),
            });
        };

        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            match key.as_str() {
                "$and" => entries.push(FilterEntry::And(branches_from_json(&key, value)?)),
                "$or" => entries.push(FilterEntry::Or(branches_from_json(&key, value)?)),
                _ if key.starts_with('$') => {
                    return Err(QueryError::InvalidFilter {
                        field: key.clone(),
                        reason: "operator is not allowed at the tree level".to_string(),
                    });
                }
                _ => {
                    let condition = condition_from_json(&key, value)?;
                    entries.push(FilterEntry::Field {
                        path: key,
                        condition,
                    });
                }
            }
        }
        Ok(FilterTree { entries })
    }
}

fn branches_from_json(
    key: &str,
    json: serde_json::Value,
) -> Result<Vec<FilterTree>, QueryError> {
    let serde_json::Value::Array(items) = json else {
        return Err(QueryError::InvalidFilter {
            field: key.to_string(),
            reason: "combinator requires an array of filters".to_string(),
        });
    };
    items.into_iter().map(FilterTree::from_json).collect()
}

fn condition_from_json(
    field: &str,
    json: serde_json::Value,
) -> Result<FieldCondition, QueryError> {
    match json {
        serde_json::Value::Object(map) => {
            let all_ops = !map.is_empty() && map.keys().all(|k| k.starts_with('$'));
            if all_ops {
                let mut ops = Vec::with_capacity(map.len());
                for (key, value) in map {
                    let operator =
                        Operator::parse(&key).ok_or_else(|| QueryError::InvalidFilter {
                            field: field.to_string(),
                            reason: format!("unknown operator \"{key}\""),
                        })?;
                    ops.push((operator, Value::from_json(value)));
                }
                Ok(FieldCondition::Ops(ops))
            } else {
                Ok(FieldCondition::Nested(FilterTree::from_json(
                    serde_json::Value::Object(map),
                )?))
            }
        }
        other => Ok(FieldCondition::Literal(Value::from_json(other))),
    }
}

impl<'de> Deserialize<'de> for FilterTree {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let json = serde_json::Value::deserialize(deserializer)?;
        FilterTree::from_json(json).map_err(serde::de::Error::custom)
    }
}

/// Order input: a single item or a list of items.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderInput {
    Single(String),
    Many(Vec<String>),
}

impl OrderInput {
    pub fn items(&self) -> Vec<String> {
        match self {
            OrderInput::Single(item) => vec![item.clone()],
            OrderInput::Many(items) => items.clone(),
        }
    }
}

/// One parsed order item: a field path plus direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub path: String,
    pub direction: OrderDir,
}

impl OrderItem {
    /// Parses `"path:asc"`, `"path:desc"`, the `"pathASC"`/`"pathDESC"`
    /// suffix forms, or a bare path (ascending).
    pub fn parse(raw: &str) -> Result<OrderItem, QueryError> {
        let invalid = || QueryError::InvalidOrder {
            item: raw.to_string(),
        };

        let (path, direction) = if let Some((path, dir)) = raw.rsplit_once(':') {
            let direction = match dir.to_ascii_lowercase().as_str() {
                "asc" => OrderDir::Asc,
                "desc" => OrderDir::Desc,
                _ => return Err(invalid()),
            };
            (path, direction)
        } else if let Some(path) = raw.strip_suffix("DESC") {
            (path, OrderDir::Desc)
        } else if let Some(path) = raw.strip_suffix("ASC") {
            (path, OrderDir::Asc)
        } else {
            (raw, OrderDir::Asc)
        };

        if path.is_empty() {
            return Err(invalid());
        }
        Ok(OrderItem {
            path: path.to_string(),
            direction,
        })
    }
}

/// The full caller-facing query description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryInput {
    #[serde(rename = "where")]
    pub filter: Option<FilterTree>,
    pub order: Option<OrderInput>,
    pub select: Option<Vec<String>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_literal_and_operator_conditions() {
        let tree = FilterTree::from_json(json!({
            "status": "active",
            "age": { "$gte": 20, "$lte": 40 },
        }))
        .unwrap();

        assert_eq!(
            tree.entries,
            vec![
                FilterEntry::Field {
                    path: "status".to_string(),
                    condition: FieldCondition::Literal(Value::String("active".to_string())),
                },
                FilterEntry::Field {
                    path: "age".to_string(),
                    condition: FieldCondition::Ops(vec![
                        (Operator::Gte, Value::Int(20)),
                        (Operator::Lte, Value::Int(40)),
                    ]),
                },
            ]
        );
    }

    #[test]
    fn test_nested_object_descends() {
        let tree = FilterTree::from_json(json!({
            "translation": { "value": { "$iLike": "%phone%" } },
        }))
        .unwrap();

        let FilterEntry::Field { path, condition } = &tree.entries[0] else {
            panic!("expected field entry");
        };
        assert_eq!(path, "translation");
        assert!(matches!(condition, FieldCondition::Nested(_)));
    }

    #[test]
    fn test_combinators() {
        let tree = FilterTree::from_json(json!({
            "$or": [
                { "name": { "$like": "a%" } },
                { "name": { "$like": "b%" } },
            ],
        }))
        .unwrap();

        let FilterEntry::Or(branches) = &tree.entries[0] else {
            panic!("expected $or entry");
        };
        assert_eq!(branches.len(), 2);
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let err = FilterTree::from_json(json!({ "age": { "$between": [1, 2] } })).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter { ref field, .. } if field == "age"));
    }

    #[test]
    fn test_tree_level_operator_is_rejected() {
        let err = FilterTree::from_json(json!({ "$eq": 1 })).unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter { .. }));
    }

    #[test]
    fn test_operator_aliases() {
        assert_eq!(Operator::parse("$noteq"), Some(Operator::NotEq));
        assert_eq!(Operator::parse("$nin"), Some(Operator::NotIn));
        assert_eq!(Operator::parse("$nilike"), Some(Operator::NotILike));
        assert_eq!(Operator::parse("$iLike"), Some(Operator::ILike));
        assert_eq!(Operator::parse("$between"), None);
    }

    #[test]
    fn test_operand_validation() {
        assert!(Operator::In.validate("f", &Value::Array(vec![])).is_ok());
        assert!(Operator::In.validate("f", &Value::Int(1)).is_err());
        assert!(
            Operator::Like
                .validate("f", &Value::String("%x%".to_string()))
                .is_ok()
        );
        assert!(Operator::Like.validate("f", &Value::Int(1)).is_err());
        assert!(
            Operator::Like
                .validate("f", &Value::String("x".repeat(MAX_PATTERN_LEN + 1)))
                .is_err()
        );
        assert!(Operator::Is.validate("f", &Value::Null).is_ok());
        assert!(Operator::IsNot.validate("f", &Value::Int(1)).is_err());
    }

    #[test]
    fn test_order_item_parsing() {
        let asc = OrderItem {
            path: "name".to_string(),
            direction: OrderDir::Asc,
        };
        assert_eq!(OrderItem::parse("name").unwrap(), asc);
        assert_eq!(OrderItem::parse("name:asc").unwrap(), asc);
        assert_eq!(OrderItem::parse("nameASC").unwrap(), asc);
        assert_eq!(
            OrderItem::parse("name:DESC").unwrap(),
            OrderItem {
                path: "name".to_string(),
                direction: OrderDir::Desc,
            }
        );
        assert_eq!(
            OrderItem::parse("nameDESC").unwrap().direction,
            OrderDir::Desc
        );
        assert!(OrderItem::parse("name:sideways").is_err());
        assert!(OrderItem::parse(":asc").is_err());
    }

    #[test]
    fn test_query_input_deserialization() {
        let input: QueryInput = serde_json::from_value(json!({
            "where": { "age": { "$gte": 21 } },
            "order": "createdAt:desc",
            "select": ["id", "name"],
            "limit": 10,
        }))
        .unwrap();

        assert!(input.filter.is_some());
        assert_eq!(
            input.order.unwrap().items(),
            vec!["createdAt:desc".to_string()]
        );
        assert_eq!(input.select.unwrap().len(), 2);
        assert_eq!(input.limit, Some(10));
        assert_eq!(input.offset, None);
    }
}
