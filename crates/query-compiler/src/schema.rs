//! The schema registry: per-entity catalogs of queryable fields.
//!
//! A [`Schema`] maps caller-facing field names to either direct columns or
//! [`Relation`] descriptors. Schemas are immutable after construction and are
//! shared behind `Arc` so many concurrent compilations can read them.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::ast::common::JoinKind;
use crate::error::QueryError;

/// A lazily-resolved reference to another schema.
///
/// Relations may point at schemas that do not exist yet when the owning
/// schema is defined (mutually recursive entities). The accessor is invoked
/// and memoized on first resolution; an accessor that yields `None` at that
/// point is a fatal configuration error.
pub struct SchemaRef {
    cell: OnceLock<Option<Arc<Schema>>>,
    init: Box<dyn Fn() -> Option<Arc<Schema>> + Send + Sync>,
}

impl SchemaRef {
    /// A deferred reference, evaluated on first use.
    pub fn lazy(init: impl Fn() -> Option<Arc<Schema>> + Send + Sync + 'static) -> Self {
        Self {
            cell: OnceLock::new(),
            init: Box::new(init),
        }
    }

    /// A reference to an already-constructed schema.
    pub fn to(schema: &Arc<Schema>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Some(Arc::clone(schema)));
        Self {
            cell,
            init: Box::new(|| None),
        }
    }

    pub fn resolve(&self) -> Option<Arc<Schema>> {
        self.cell.get_or_init(|| (self.init)()).clone()
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(Some(schema)) => write!(f, "SchemaRef({})", schema.table()),
            Some(None) => write!(f, "SchemaRef(<unresolved>)"),
            None => write!(f, "SchemaRef(<lazy>)"),
        }
    }
}

/// One additional equal-column condition for a composite join key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPair {
    pub source: String,
    pub target: String,
}

/// A join descriptor: how a field traverses into another entity.
#[derive(Debug)]
pub struct Relation {
    column: String,
    kind: JoinKind,
    target: SchemaRef,
    target_field: String,
    composite: Vec<ColumnPair>,
}

impl Relation {
    /// `column` is the join column on the owning entity; `target_field` is
    /// the field name in the target schema to join on.
    pub fn new(column: &str, target: SchemaRef, target_field: &str) -> Self {
        Self {
            column: column.to_string(),
            kind: JoinKind::Left,
            target,
            target_field: target_field.to_string(),
            composite: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    /// Adds an extra `source = target` column pair to the join key.
    pub fn composite(mut self, source: &str, target: &str) -> Self {
        self.composite.push(ColumnPair {
            source: source.to_string(),
            target: target.to_string(),
        });
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn join_kind(&self) -> JoinKind {
        self.kind
    }

    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    pub fn composite_pairs(&self) -> &[ColumnPair] {
        &self.composite
    }

    pub fn target(&self) -> Option<Arc<Schema>> {
        self.target.resolve()
    }
}

/// A field descriptor: either a direct column or a relation.
#[derive(Debug)]
pub enum FieldDef {
    Column(String),
    Relation(Relation),
}

/// One queryable entity: its backing table and its field catalog.
#[derive(Debug)]
pub struct Schema {
    table: String,
    fields: Vec<(String, FieldDef)>,
    index: HashMap<String, usize>,
    default_fields: Vec<String>,
    default_order: Vec<String>,
}

impl Schema {
    pub fn builder(table: &str) -> SchemaBuilder {
        SchemaBuilder {
            table: table.to_string(),
            fields: Vec::new(),
            default_fields: Vec::new(),
            default_order: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.index.get(name).map(|i| &self.fields[*i].1)
    }

    pub fn has_join(&self, name: &str) -> bool {
        matches!(self.get_field(name), Some(FieldDef::Relation(_)))
    }

    pub fn get_join(&self, name: &str) -> Option<&Relation> {
        match self.get_field(name) {
            Some(FieldDef::Relation(relation)) => Some(relation),
            _ => None,
        }
    }

    /// Resolves the target schema of a relation field, memoizing the lazy
    /// accessor on first use.
    pub fn resolve_join_target(&self, name: &str) -> Result<Arc<Schema>, QueryError> {
        let relation = self.get_join(name).ok_or_else(|| QueryError::UnknownField {
            path: name.to_string(),
        })?;
        relation
            .target()
            .ok_or_else(|| QueryError::UnresolvedRelation {
                field: name.to_string(),
            })
    }

    /// The declared column name backing a field, for either field kind.
    pub fn column_name(&self, name: &str) -> Option<&str> {
        match self.get_field(name)? {
            FieldDef::Column(column) => Some(column),
            FieldDef::Relation(relation) => Some(relation.column()),
        }
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn default_fields(&self) -> &[String] {
        &self.default_fields
    }

    pub fn default_order(&self) -> &[String] {
        &self.default_order
    }
}

pub struct SchemaBuilder {
    table: String,
    fields: Vec<(String, FieldDef)>,
    default_fields: Vec<String>,
    default_order: Vec<String>,
}

impl SchemaBuilder {
    pub fn column(mut self, name: &str, column: &str) -> Self {
        self.fields
            .push((name.to_string(), FieldDef::Column(column.to_string())));
        self
    }

    pub fn relation(mut self, name: &str, relation: Relation) -> Self {
        self.fields
            .push((name.to_string(), FieldDef::Relation(relation)));
        self
    }

    pub fn default_fields(mut self, fields: &[&str]) -> Self {
        self.default_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Default order items, e.g. `["createdAt:desc"]`.
    pub fn default_order(mut self, order: &[&str]) -> Self {
        self.default_order = order.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn build(self) -> Arc<Schema> {
        let index = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        Arc::new(Schema {
            table: self.table,
            fields: self.fields,
            index,
            default_fields: self.default_fields,
            default_order: self.default_order,
        })
    }
}
