//! Error types for the relay.

use thiserror::Error;

/// Result type alias using the relay error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Startup errors surfaced by the shared crates.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Process exit code for this error when it reaches `main`.
    pub fn exit_code(&self) -> i32 {
        match self {
            // EX_CONFIG
            Self::Config(_) => 78,
        }
    }
}

impl From<crate::validation::ValidationError> for Error {
    fn from(err: crate::validation::ValidationError) -> Self {
        Self::Config(err.to_string())
    }
}
