//! Error types for AuthLatch

use thiserror::Error;

/// Main error type for AuthLatch operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LatchError {
    /// Claim rejected because the claimant name is unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No claim is currently active
    #[error("Not authorized")]
    NotAuthorized,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for AuthLatch operations
pub type Result<T> = std::result::Result<T, LatchError>;
