use thiserror::Error;

/// Errors raised while compiling a query description into a statement.
///
/// All variants are deterministic functions of the input: compiling the same
/// schema and query twice produces the same error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown field \"{path}\"")]
    UnknownField { path: String },

    #[error("relation \"{field}\" has no resolvable target schema")]
    UnresolvedRelation { field: String },

    #[error("invalid filter on \"{field}\": {reason}")]
    InvalidFilter { field: String, reason: String },

    #[error("invalid order item \"{item}\"")]
    InvalidOrder { item: String },

    #[error("join depth {depth} exceeds maximum of {max}")]
    JoinDepthExceeded { depth: usize, max: usize },

    #[error("duplicate field \"{path}\" in select")]
    DuplicateSelectField { path: String },

    #[error("requested limit {requested} exceeds maximum allowed limit {maximum}")]
    MaxLimitExceeded { requested: i64, maximum: i64 },
}
