//! Compiler-wide configuration and defaults.

/// What to do when a requested limit exceeds `max_limit`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LimitPolicy {
    /// Silently clamp the limit down to `max_limit`.
    #[default]
    Clamp,
    /// Fail with `QueryError::MaxLimitExceeded`.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Limit applied when the caller does not request one.
    pub default_limit: i64,
    /// Upper bound for the resolved limit.
    pub max_limit: i64,
    /// Maximum number of relation hops a single query may traverse.
    pub max_join_depth: usize,
    pub limit_policy: LimitPolicy,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            max_join_depth: 5,
            limit_policy: LimitPolicy::Clamp,
        }
    }
}
