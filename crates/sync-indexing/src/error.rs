//! Error types for the indexing pipeline.

use sync_search::SearchError;
use sync_types::SyncError;
use thiserror::Error;

/// Errors that can occur in the indexing pipeline
#[derive(Error, Debug)]
pub enum IndexingError {
    /// An index with the same name is already registered
    #[error("Index already registered: {0}")]
    DuplicateIndex(String),

    /// An index id is used by more than one definition
    #[error("Index id already registered: {0}")]
    DuplicateIndexId(i32),

    /// A task or lookup referenced an index that is not registered
    #[error("Index not registered: {0}")]
    UnknownIndex(String),

    /// Caller passed a missing or malformed argument
    #[error(transparent)]
    Invalid(#[from] SyncError),

    /// Search engine error
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// No strategy registered under the given name
    #[error("Unknown indexing strategy: {0}")]
    UnknownStrategy(String),

    /// A strategy failed to build a document
    #[error("Strategy error: {0}")]
    Strategy(String),

    /// Definition store load/save issues
    #[error("Definition store error: {0}")]
    Store(String),

    /// Content source could not be read
    #[error("Content source error: {0}")]
    Source(String),

    /// Operation was cancelled before completion
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<std::io::Error> for IndexingError {
    fn from(err: std::io::Error) -> Self {
        IndexingError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexingError::DuplicateIndex("Products".to_string());
        assert_eq!(err.to_string(), "Index already registered: Products");

        let err = IndexingError::UnknownIndex("Missing".to_string());
        assert_eq!(err.to_string(), "Index not registered: Missing");

        let err = IndexingError::from(SyncError::missing("index_name"));
        assert_eq!(
            err.to_string(),
            "Invalid argument: index_name must not be empty"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: IndexingError = io.into();
        assert!(matches!(err, IndexingError::Store(_)));
    }
}
