use crate::{
    ast::expr::{BinaryOp, BinaryOperator, Expr, Ident},
    render::{Render, Renderer},
};

impl Render for Expr {
    fn render(&self, r: &mut Renderer) {
        match self {
            Expr::Identifier(ident) => ident.render(r),
            Expr::Value(val) => r.add_param(val.clone()),
            Expr::BinaryOp(op) => op.render(r),
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                expr.render(r);
                r.sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        r.sql.push_str(", ");
                    }
                    item.render(r);
                }
                r.sql.push(')');
            }
            Expr::IsNull { expr, negated } => {
                expr.render(r);
                r.sql
                    .push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Expr::Constant(value) => {
                r.sql.push_str(if *value { "TRUE" } else { "FALSE" });
            }
            Expr::Wildcard { qualifier } => {
                if let Some(qualifier) = qualifier {
                    r.sql.push_str(&r.dialect.quote_identifier(qualifier));
                    r.sql.push('.');
                }
                r.sql.push('*');
            }
            Expr::Alias { expr, alias } => {
                expr.render(r);
                r.sql.push_str(" AS ");
                r.sql.push_str(&r.dialect.quote_identifier(alias));
            }
        }
    }
}

impl Render for Ident {
    fn render(&self, r: &mut Renderer) {
        if let Some(qualifier) = &self.qualifier {
            r.sql.push_str(&r.dialect.quote_identifier(qualifier));
            r.sql.push('.');
        }
        r.sql.push_str(&r.dialect.quote_identifier(&self.name));
    }
}

impl Render for BinaryOp {
    fn render(&self, r: &mut Renderer) {
        r.sql.push('(');
        self.left.render(r);

        let op_str = match self.op {
            BinaryOperator::Eq => " = ",
            BinaryOperator::NotEq => " <> ",
            BinaryOperator::Lt => " < ",
            BinaryOperator::LtEq => " <= ",
            BinaryOperator::Gt => " > ",
            BinaryOperator::GtEq => " >= ",
            BinaryOperator::Like => " LIKE ",
            BinaryOperator::ILike => " ILIKE ",
            BinaryOperator::NotLike => " NOT LIKE ",
            BinaryOperator::NotILike => " NOT ILIKE ",
            BinaryOperator::And => " AND ",
            BinaryOperator::Or => " OR ",
        };
        r.sql.push_str(op_str);

        self.right.render(r);
        r.sql.push(')');
    }
}
