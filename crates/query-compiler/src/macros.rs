#[macro_export]
macro_rules! value {
    ($val:expr) => {
        $crate::ast::expr::Expr::Value($val)
    };
}

#[macro_export]
macro_rules! table_ref {
    ($name:expr) => {
        $crate::ast::common::TableRef {
            schema: None,
            name: $name.to_string(),
        }
    };
    ($schema:expr, $name:expr) => {
        $crate::ast::common::TableRef {
            schema: Some($schema.to_string()),
            name: $name.to_string(),
        }
    };
}

#[macro_export]
macro_rules! ident {
    ($name:expr) => {
        $crate::ast::expr::Expr::Identifier($crate::ast::expr::Ident {
            qualifier: None,
            name: $name.to_string(),
        })
    };
}

/// Creates a qualified identifier expression, e.g. `"t0_users"."id"`.
#[macro_export]
macro_rules! qual_ident {
    ($qualifier:expr, $name:expr) => {
        $crate::ast::expr::Expr::Identifier($crate::ast::expr::Ident {
            qualifier: Some($qualifier.to_string()),
            name: $name.to_string(),
        })
    };
}
