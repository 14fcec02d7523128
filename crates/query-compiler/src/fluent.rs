//! A reusable query definition with server-side defaults and guards.
//!
//! A [`QueryDef`] pairs a schema with policy the caller cannot override:
//! default filter, order and select, always-included or always-excluded
//! columns, and a hard limit cap. Definitions are immutable; every builder
//! method returns a new definition, so a shared base can be specialized per
//! endpoint without affecting the base definition.

use std::sync::Arc;

use crate::{
    compile::{compile, Statement},
    config::{CompilerConfig, LimitPolicy},
    error::QueryError,
    input::{FilterTree, OrderInput, QueryInput},
    schema::Schema,
};

#[derive(Debug, Clone)]
pub struct QueryDef {
    schema: Arc<Schema>,
    default_where: Option<FilterTree>,
    default_order: Option<Vec<String>>,
    default_select: Option<Vec<String>>,
    include: Vec<String>,
    exclude: Vec<String>,
    default_limit: Option<i64>,
    max_limit: Option<i64>,
    max_join_depth: Option<usize>,
}

impl QueryDef {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            default_where: None,
            default_order: None,
            default_select: None,
            include: Vec::new(),
            exclude: Vec::new(),
            default_limit: None,
            max_limit: None,
            max_join_depth: None,
        }
    }

    /// Filter applied when the caller sends none.
    pub fn default_where(&self, tree: FilterTree) -> Self {
        let mut def = self.clone();
        def.default_where = Some(tree);
        def
    }

    /// Order applied when the caller sends none.
    pub fn default_order(&self, items: &[&str]) -> Self {
        let mut def = self.clone();
        def.default_order = Some(items.iter().map(|i| i.to_string()).collect());
        def
    }

    /// Select list applied when the caller sends none.
    pub fn default_select(&self, fields: &[&str]) -> Self {
        let mut def = self.clone();
        def.default_select = Some(fields.iter().map(|f| f.to_string()).collect());
        def
    }

    /// Fields appended to any resolved select list.
    pub fn include(&self, fields: &[&str]) -> Self {
        let mut def = self.clone();
        def.include
            .extend(fields.iter().map(|f| f.to_string()));
        def
    }

    /// Fields removed from any resolved select list.
    pub fn exclude(&self, fields: &[&str]) -> Self {
        let mut def = self.clone();
        def.exclude
            .extend(fields.iter().map(|f| f.to_string()));
        def
    }

    pub fn default_limit(&self, limit: i64) -> Self {
        let mut def = self.clone();
        def.default_limit = Some(limit);
        def
    }

    /// Hard cap; a request above it fails instead of being clamped.
    pub fn max_limit(&self, limit: i64) -> Self {
        let mut def = self.clone();
        def.max_limit = Some(limit);
        def
    }

    pub fn max_join_depth(&self, depth: usize) -> Self {
        let mut def = self.clone();
        def.max_join_depth = Some(depth);
        def
    }

    /// Compiles caller input merged with this definition's defaults.
    pub fn to_statement(&self, input: &QueryInput) -> Result<Statement, QueryError> {
        let defaults = CompilerConfig::default();
        let mut effective = input.clone();

        if effective.filter.is_none() {
            effective.filter = self.default_where.clone();
        }
        if effective.order.is_none() {
            effective.order = self.default_order.clone().map(OrderInput::Many);
        }

        let mut select = effective
            .select
            .filter(|fields| !fields.is_empty())
            .or_else(|| self.default_select.clone());
        if let Some(fields) = &mut select {
            for field in &self.include {
                if !fields.contains(field) {
                    fields.push(field.clone());
                }
            }
            fields.retain(|field| !self.exclude.contains(field));
        }
        effective.select = select;

        let config = CompilerConfig {
            default_limit: self.default_limit.unwrap_or(defaults.default_limit),
            max_limit: self.max_limit.unwrap_or(defaults.max_limit),
            max_join_depth: self.max_join_depth.unwrap_or(defaults.max_join_depth),
            limit_policy: LimitPolicy::Reject,
        };
        compile(&self.schema, &effective, &config)
    }
}
