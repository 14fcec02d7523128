//! The join planner: collects every relation traversal a query needs.
//!
//! The plan is built before any SQL is produced, scanning the filter tree,
//! then order items, then select paths. Each distinct (source alias, relation
//! field) pair joins at most once; the alias of a joined table encodes the
//! order it entered the plan, so two different traversals can never collide
//! on an alias.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::{
    ast::common::JoinKind,
    error::QueryError,
    input::{FieldCondition, FilterEntry, FilterTree},
    normalize::{Projection, QueryDescriptor},
    schema::{FieldDef, Schema},
};

/// Alias of a table at the given plan position, e.g. `t0_users`.
pub fn table_alias(table: &str, depth: usize) -> String {
    format!("t{depth}_{table}")
}

/// One planned join, fully resolved to tables, aliases and column pairs.
#[derive(Debug)]
pub struct JoinEntry {
    pub kind: JoinKind,
    pub source_alias: String,
    pub table: String,
    pub alias: String,
    /// Equal-column pairs as (source column, target column).
    pub pairs: Vec<(String, String)>,
    pub target: Arc<Schema>,
}

#[derive(Debug)]
pub struct JoinPlan {
    root_alias: String,
    entries: Vec<JoinEntry>,
    by_key: HashMap<(String, String), usize>,
    max_depth: usize,
}

impl JoinPlan {
    fn new(root: &Schema, max_depth: usize) -> Self {
        Self {
            root_alias: table_alias(root.table(), 0),
            entries: Vec::new(),
            by_key: HashMap::new(),
            max_depth,
        }
    }

    pub fn root_alias(&self) -> &str {
        &self.root_alias
    }

    /// Joins in the order they entered the plan.
    pub fn entries(&self) -> &[JoinEntry] {
        &self.entries
    }

    /// The join previously planned for a relation field in a given scope.
    pub fn lookup(&self, source_alias: &str, field: &str) -> Option<&JoinEntry> {
        self.by_key
            .get(&(source_alias.to_string(), field.to_string()))
            .map(|i| &self.entries[*i])
    }

    /// Plans a join for `field` of the scope at `source_alias`, reusing an
    /// existing entry when the same traversal was planned before. `depth` is
    /// the number of relation hops from the root to the target; only that
    /// per-path depth is capped, not the total number of joins.
    fn enter(
        &mut self,
        source: &Schema,
        source_alias: &str,
        field: &str,
        full_path: &str,
        depth: usize,
    ) -> Result<(String, Arc<Schema>), QueryError> {
        let key = (source_alias.to_string(), field.to_string());
        if let Some(&i) = self.by_key.get(&key) {
            let entry = &self.entries[i];
            return Ok((entry.alias.clone(), Arc::clone(&entry.target)));
        }

        let relation = source.get_join(field).ok_or_else(|| QueryError::UnknownField {
            path: full_path.to_string(),
        })?;
        let target = source.resolve_join_target(field)?;

        if depth > self.max_depth {
            return Err(QueryError::JoinDepthExceeded {
                depth,
                max: self.max_depth,
            });
        }
        let alias = table_alias(target.table(), self.entries.len() + 1);

        let target_column = target
            .column_name(relation.target_field())
            .unwrap_or(relation.target_field())
            .to_string();
        let mut pairs = vec![(relation.column().to_string(), target_column)];
        for pair in relation.composite_pairs() {
            pairs.push((pair.source.clone(), pair.target.clone()));
        }

        debug!(source = source_alias, field, alias = %alias, "planned join");
        self.entries.push(JoinEntry {
            kind: relation.join_kind(),
            source_alias: source_alias.to_string(),
            table: target.table().to_string(),
            alias: alias.clone(),
            pairs,
            target: Arc::clone(&target),
        });
        self.by_key.insert(key, self.entries.len() - 1);
        Ok((alias, target))
    }
}

/// Builds the join plan for a normalized query: filters first, then order,
/// then select.
pub fn plan_joins(
    schema: &Arc<Schema>,
    desc: &QueryDescriptor,
    max_depth: usize,
) -> Result<JoinPlan, QueryError> {
    let mut plan = JoinPlan::new(schema, max_depth);
    let root_alias = plan.root_alias.clone();

    scan_filter(&mut plan, schema, &root_alias, "", 0, &desc.filter)?;
    for item in &desc.order {
        // A bare relation in order sorts by its own column; no join.
        scan_path(&mut plan, schema, &root_alias, &item.path, false)?;
    }
    if let Projection::Fields(fields) = &desc.select {
        for path in fields {
            // Selecting a relation joins its target even without descending.
            scan_path(&mut plan, schema, &root_alias, path, true)?;
        }
    }
    Ok(plan)
}

pub(crate) fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

fn scan_filter(
    plan: &mut JoinPlan,
    schema: &Arc<Schema>,
    alias: &str,
    prefix: &str,
    depth: usize,
    tree: &FilterTree,
) -> Result<(), QueryError> {
    for entry in &tree.entries {
        match entry {
            FilterEntry::And(branches) | FilterEntry::Or(branches) => {
                for branch in branches {
                    scan_filter(plan, schema, alias, prefix, depth, branch)?;
                }
            }
            FilterEntry::Field { path, condition } => {
                scan_field(plan, schema, alias, prefix, depth, path, condition)?;
            }
        }
    }
    Ok(())
}

fn scan_field(
    plan: &mut JoinPlan,
    schema: &Arc<Schema>,
    alias: &str,
    prefix: &str,
    depth: usize,
    path: &str,
    condition: &FieldCondition,
) -> Result<(), QueryError> {
    let mut schema = Arc::clone(schema);
    let mut alias = alias.to_string();
    let mut walked = prefix.to_string();
    let mut depth = depth;

    let segments: Vec<&str> = path.split('.').collect();
    for segment in &segments[..segments.len() - 1] {
        let full = join_path(&walked, segment);
        match schema.get_field(segment) {
            Some(FieldDef::Relation(_)) => {
                depth += 1;
                let (next_alias, next_schema) =
                    plan.enter(&schema, &alias, segment, &full, depth)?;
                alias = next_alias;
                schema = next_schema;
                walked = full;
            }
            Some(FieldDef::Column(_)) => {
                return Err(QueryError::InvalidFilter {
                    field: full,
                    reason: "field is not a relation".to_string(),
                });
            }
            None => return Err(QueryError::UnknownField { path: full }),
        }
    }

    let segment = segments[segments.len() - 1];
    let full = join_path(&walked, segment);
    match schema.get_field(segment) {
        None => Err(QueryError::UnknownField { path: full }),
        Some(FieldDef::Column(_)) => match condition {
            FieldCondition::Nested(_) => Err(QueryError::InvalidFilter {
                field: full,
                reason: "field does not support nested filters".to_string(),
            }),
            _ => Ok(()),
        },
        Some(FieldDef::Relation(_)) => match condition {
            FieldCondition::Nested(tree) => {
                let (next_alias, next_schema) =
                    plan.enter(&schema, &alias, segment, &full, depth + 1)?;
                scan_filter(plan, &next_schema, &next_alias, &full, depth + 1, tree)
            }
            // Operator and literal conditions compare the relation's own
            // column on the source table.
            _ => Ok(()),
        },
    }
}

fn scan_path(
    plan: &mut JoinPlan,
    schema: &Arc<Schema>,
    alias: &str,
    path: &str,
    join_final_relation: bool,
) -> Result<(), QueryError> {
    let mut schema = Arc::clone(schema);
    let mut alias = alias.to_string();
    let mut walked = String::new();
    let mut depth = 0;

    let segments: Vec<&str> = path.split('.').collect();
    for (i, segment) in segments.iter().enumerate() {
        let full = join_path(&walked, segment);
        let last = i == segments.len() - 1;
        match schema.get_field(segment) {
            Some(FieldDef::Column(_)) if last => {}
            Some(FieldDef::Relation(_)) if last && !join_final_relation => {}
            Some(FieldDef::Relation(_)) => {
                depth += 1;
                let (next_alias, next_schema) =
                    plan.enter(&schema, &alias, segment, &full, depth)?;
                alias = next_alias;
                schema = next_schema;
                walked = full;
            }
            _ => return Err(QueryError::UnknownField { path: full }),
        }
    }
    Ok(())
}
