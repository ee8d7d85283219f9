//! Error types for the search-sync system.

use thiserror::Error;

/// Unified error type for domain-level operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A required argument was missing or empty. Always a caller bug.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl SyncError {
    /// Shorthand for an invalid-argument error naming the offending field.
    pub fn missing(field: &str) -> Self {
        SyncError::InvalidArgument(format!("{field} must not be empty"))
    }
}
