//! Limit and offset resolution against the configured bounds.

use crate::{
    config::{CompilerConfig, LimitPolicy},
    error::QueryError,
};

/// Resolved paging: both values are always present in the final statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

/// Applies defaults and bounds to the requested limit and offset.
pub fn resolve(
    limit: Option<i64>,
    offset: Option<i64>,
    config: &CompilerConfig,
) -> Result<Pagination, QueryError> {
    let requested = limit.unwrap_or(config.default_limit);
    let limit = if requested > config.max_limit {
        match config.limit_policy {
            LimitPolicy::Clamp => config.max_limit,
            LimitPolicy::Reject => {
                return Err(QueryError::MaxLimitExceeded {
                    requested,
                    maximum: config.max_limit,
                });
            }
        }
    } else {
        requested.max(0)
    };
    let offset = offset.unwrap_or(0).max(0);
    Ok(Pagination { limit, offset })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply() {
        let config = CompilerConfig::default();
        let page = resolve(None, None, &config).unwrap();
        assert_eq!(page, Pagination { limit: 20, offset: 0 });
    }

    #[test]
    fn test_clamp_policy() {
        let config = CompilerConfig::default();
        let page = resolve(Some(500), Some(-3), &config).unwrap();
        assert_eq!(page, Pagination { limit: 100, offset: 0 });
    }

    #[test]
    fn test_reject_policy() {
        let config = CompilerConfig {
            limit_policy: LimitPolicy::Reject,
            ..Default::default()
        };
        let err = resolve(Some(500), None, &config).unwrap_err();
        assert_eq!(
            err,
            QueryError::MaxLimitExceeded {
                requested: 500,
                maximum: 100
            }
        );
    }

    #[test]
    fn test_negative_limit_is_clamped_to_zero() {
        let config = CompilerConfig::default();
        let page = resolve(Some(-1), Some(7), &config).unwrap();
        assert_eq!(page, Pagination { limit: 0, offset: 7 });
    }
}
