//! Search error types.

use thiserror::Error;

/// Errors that can occur while talking to the search engine.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Index not found
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Schema mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Index is locked (another process has it open)
    #[error("Index is locked: {0}")]
    IndexLocked(String),

    /// On-disk index metadata could not be interpreted
    #[error("Index metadata unreadable: {0}")]
    Metadata(String),

    /// Blocking index task panicked or was cancelled
    #[error("Index task failed: {0}")]
    Task(String),

    /// The remote service rejected the request
    #[error("Request rejected for index {index}: {reason}")]
    Rejected { index: String, reason: String },
}
