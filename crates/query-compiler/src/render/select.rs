use crate::{
    ast::{
        common::{JoinKind, OrderDir},
        select::{FromClause, JoinClause, OrderByExpr, Select},
    },
    render::{Render, Renderer},
};

impl Render for Select {
    fn render(&self, r: &mut Renderer) {
        // 1. SELECT clause
        r.sql.push_str("SELECT ");
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            col.render(r);
        }

        // 2. FROM
        if let Some(from) = &self.from {
            r.sql.push(' ');
            from.render(r);
        }

        // 3. JOIN
        for join in &self.joins {
            r.sql.push(' ');
            join.render(r);
        }

        // 4. WHERE
        if let Some(where_clause) = &self.where_clause {
            r.sql.push_str(" WHERE ");
            where_clause.render(r);
        }

        // 5. ORDER BY
        if !self.order_by.is_empty() {
            r.sql.push_str(" ORDER BY ");
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                order.render(r);
            }
        }

        // 6. LIMIT
        if let Some(limit) = &self.limit {
            r.sql.push_str(" LIMIT ");
            limit.render(r);
        }

        // 7. OFFSET
        if let Some(offset) = &self.offset {
            r.sql.push_str(" OFFSET ");
            offset.render(r);
        }
    }
}

impl Render for FromClause {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("FROM ");
        r.sql
            .push_str(&r.dialect.quote_identifier(&self.table.name));
        if let Some(alias) = &self.alias {
            r.sql.push_str(" AS ");
            r.sql.push_str(&r.dialect.quote_identifier(alias));
        }
    }
}

impl Render for JoinClause {
    fn render(&self, r: &mut Renderer) {
        let join_str = match self.kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        };
        r.sql.push_str(&format!("{join_str} "));
        r.sql
            .push_str(&r.dialect.quote_identifier(&self.table.name));
        if let Some(alias) = &self.alias {
            r.sql.push_str(" AS ");
            r.sql.push_str(&r.dialect.quote_identifier(alias));
        }
        r.sql.push_str(" ON ");
        self.on.render(r);
    }
}

impl Render for OrderByExpr {
    fn render(&self, r: &mut Renderer) {
        self.expr.render(r);
        if let Some(dir) = &self.direction {
            let dir_str = match dir {
                OrderDir::Asc => "ASC",
                OrderDir::Desc => "DESC",
            };
            r.sql.push(' ');
            r.sql.push_str(dir_str);
        }
    }
}

#[cfg(test)]
mod tests {
    use model::core::value::Value;

    use crate::{
        ast::{
            common::{JoinKind, OrderDir, TableRef},
            expr::{BinaryOp, BinaryOperator, Expr},
            select::{FromClause, JoinClause, OrderByExpr, Select},
        },
        dialect::Postgres,
        qual_ident, table_ref, value,
    };

    use super::*;

    fn alias_col(qualifier: &str, name: &str, output: &str) -> Expr {
        Expr::Alias {
            expr: Box::new(qual_ident!(qualifier, name)),
            alias: output.to_string(),
        }
    }

    #[test]
    fn test_render_simple_select() {
        let ast = Select {
            columns: vec![
                alias_col("t0_users", "id", "id"),
                alias_col("t0_users", "name", "name"),
            ],
            from: Some(FromClause {
                table: table_ref!("users"),
                alias: Some("t0_users".to_string()),
            }),
            where_clause: Some(Expr::BinaryOp(Box::new(BinaryOp {
                left: qual_ident!("t0_users", "id"),
                op: BinaryOperator::Eq,
                right: value!(Value::Int(123)),
            }))),
            limit: Some(value!(Value::Int(20))),
            offset: Some(value!(Value::Int(0))),
            ..Default::default()
        };

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();

        assert_eq!(
            sql,
            r#"SELECT "t0_users"."id" AS "id", "t0_users"."name" AS "name" FROM "users" AS "t0_users" WHERE ("t0_users"."id" = $1) LIMIT $2 OFFSET $3"#
        );
        assert_eq!(
            params,
            vec![Value::Int(123), Value::Int(20), Value::Int(0)]
        );
    }

    #[test]
    fn test_render_join_and_order() {
        let ast = Select {
            columns: vec![Expr::Wildcard {
                qualifier: Some("t0_products".to_string()),
            }],
            from: Some(FromClause {
                table: table_ref!("products"),
                alias: Some("t0_products".to_string()),
            }),
            joins: vec![JoinClause {
                kind: JoinKind::Left,
                table: table_ref!("translations"),
                alias: Some("t1_translations".to_string()),
                on: Expr::BinaryOp(Box::new(BinaryOp {
                    left: qual_ident!("t0_products", "id"),
                    op: BinaryOperator::Eq,
                    right: qual_ident!("t1_translations", "entity_id"),
                })),
            }],
            order_by: vec![OrderByExpr {
                expr: qual_ident!("t1_translations", "value"),
                direction: Some(OrderDir::Desc),
            }],
            limit: Some(value!(Value::Int(10))),
            offset: Some(value!(Value::Int(5))),
            ..Default::default()
        };

        let dialect = Postgres;
        let mut renderer = Renderer::new(&dialect);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();

        let expected = r#"SELECT "t0_products".* FROM "products" AS "t0_products" LEFT JOIN "translations" AS "t1_translations" ON ("t0_products"."id" = "t1_translations"."entity_id") ORDER BY "t1_translations"."value" DESC LIMIT $1 OFFSET $2"#;
        assert_eq!(sql, expected);
        assert_eq!(params, vec![Value::Int(10), Value::Int(5)]);
    }
}
