//! Search client trait.
//!
//! Every operation is idempotent from the caller's perspective: upserting the
//! same document twice or deleting a missing id is not an error.

use async_trait::async_trait;

use crate::document::{IndexStatistics, SearchDocument};
use crate::error::SearchError;

/// Bulk operations against an external search engine.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Create or replace the given documents. Returns the number written.
    async fn upsert_documents(
        &self,
        index_name: &str,
        documents: Vec<SearchDocument>,
    ) -> Result<usize, SearchError>;

    /// Remove documents by id. Returns the number of ids submitted.
    async fn delete_documents(
        &self,
        index_name: &str,
        ids: Vec<String>,
    ) -> Result<usize, SearchError>;

    /// Entry count and last update time for an index.
    async fn get_statistics(&self, index_name: &str) -> Result<IndexStatistics, SearchError>;

    /// Drop every document of an index so it can be repopulated from scratch.
    async fn rebuild_index(&self, index_name: &str) -> Result<(), SearchError>;

    /// Name of this client for logging.
    fn name(&self) -> &str;
}
