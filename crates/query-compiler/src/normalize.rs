//! Turns raw caller input into a canonical query descriptor.
//!
//! Normalization fills in schema-level defaults, parses order items and
//! resolves paging so every later stage works from one canonical shape.

use crate::{
    config::CompilerConfig,
    error::QueryError,
    input::{FilterTree, OrderItem, QueryInput},
    pagination::{self, Pagination},
    schema::Schema,
};

/// Which columns a query projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// All columns of the root table (`"t0_x".*`).
    AllFields,
    /// Explicitly requested field paths, in request order.
    Fields(Vec<String>),
}

/// The canonical form of a query, ready for planning and compilation.
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    pub filter: FilterTree,
    pub order: Vec<OrderItem>,
    pub select: Projection,
    pub page: Pagination,
}

pub fn normalize(
    schema: &Schema,
    input: &QueryInput,
    config: &CompilerConfig,
) -> Result<QueryDescriptor, QueryError> {
    let filter = input.filter.clone().unwrap_or_default();

    let raw_order = match &input.order {
        Some(order) => order.items(),
        None => schema.default_order().to_vec(),
    };
    let order = raw_order
        .iter()
        .map(|item| OrderItem::parse(item))
        .collect::<Result<Vec<_>, _>>()?;

    // An empty select list means the caller wants the defaults.
    let select = match &input.select {
        Some(fields) if !fields.is_empty() => Projection::Fields(fields.clone()),
        _ if !schema.default_fields().is_empty() => {
            Projection::Fields(schema.default_fields().to_vec())
        }
        _ => Projection::AllFields,
    };

    let page = pagination::resolve(input.limit, input.offset, config)?;

    Ok(QueryDescriptor {
        filter,
        order,
        select,
        page,
    })
}

#[cfg(test)]
mod tests {
    use crate::ast::common::OrderDir;
    use crate::schema::Schema;

    use super::*;

    #[test]
    fn test_schema_defaults_fill_the_gaps() {
        let schema = Schema::builder("users")
            .column("id", "id")
            .column("createdAt", "created_at")
            .default_fields(&["id"])
            .default_order(&["createdAt:desc"])
            .build();

        let desc = normalize(&schema, &QueryInput::default(), &CompilerConfig::default()).unwrap();

        assert!(desc.filter.is_empty());
        assert_eq!(desc.order.len(), 1);
        assert_eq!(desc.order[0].path, "createdAt");
        assert_eq!(desc.order[0].direction, OrderDir::Desc);
        assert_eq!(desc.select, Projection::Fields(vec!["id".to_string()]));
        assert_eq!(desc.page.limit, 20);
        assert_eq!(desc.page.offset, 0);
    }

    #[test]
    fn test_empty_select_means_all_fields() {
        let schema = Schema::builder("users").column("id", "id").build();
        let input = QueryInput {
            select: Some(vec![]),
            ..Default::default()
        };

        let desc = normalize(&schema, &input, &CompilerConfig::default()).unwrap();
        assert_eq!(desc.select, Projection::AllFields);
    }

    #[test]
    fn test_explicit_input_wins_over_defaults() {
        let schema = Schema::builder("users")
            .column("id", "id")
            .column("name", "name")
            .default_fields(&["id"])
            .default_order(&["id"])
            .build();
        let input = QueryInput {
            order: Some(crate::input::OrderInput::Many(vec!["name:desc".to_string()])),
            select: Some(vec!["name".to_string()]),
            limit: Some(5),
            offset: Some(10),
            ..Default::default()
        };

        let desc = normalize(&schema, &input, &CompilerConfig::default()).unwrap();
        assert_eq!(desc.order[0].path, "name");
        assert_eq!(desc.select, Projection::Fields(vec!["name".to_string()]));
        assert_eq!(desc.page.limit, 5);
        assert_eq!(desc.page.offset, 10);
    }
}
