//! Audit error types.

use thiserror::Error;

use crate::config::ValidationError;

/// Errors raised inside the audit subsystem.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A thread panicked while holding a lock; the guarded state may be torn.
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    /// A query path pattern is not a valid regular expression.
    #[error("invalid path pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The interceptor was built with unusable settings.
    #[error("invalid interceptor configuration: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    InvalidConfig(Vec<ValidationError>),
}
