//! Session error types.
//!
//! These are the user-correctable failures. Network failures are not errors
//! here; they are `GenerateOutcome` variants.

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("No endpoint bound for this session")]
    NotBound,
}
