//! In-process search client.
//!
//! Keeps documents in memory and records every call it receives, so tests can
//! assert exactly which bulk operations the pipeline issued.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::client::SearchClient;
use crate::document::{IndexStatistics, SearchDocument};
use crate::error::SearchError;

/// A call received by [`InMemorySearchClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Upsert { index: String, ids: Vec<String> },
    Delete { index: String, ids: Vec<String> },
    Statistics { index: String },
    Rebuild { index: String },
}

#[derive(Debug, Default)]
struct MemoryIndex {
    documents: BTreeMap<String, SearchDocument>,
    last_updated_at: Option<DateTime<Utc>>,
}

/// Search client backed by in-memory maps.
#[derive(Debug, Default)]
pub struct InMemorySearchClient {
    indexes: RwLock<HashMap<String, MemoryIndex>>,
    calls: Mutex<Vec<ClientCall>>,
    failing: RwLock<HashSet<String>>,
}

impl InMemorySearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write to `index_name` fail with [`SearchError::Rejected`].
    pub fn fail_index(&self, index_name: &str) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index_name.to_lowercase());
    }

    /// Stop failing writes to `index_name`.
    pub fn recover_index(&self, index_name: &str) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&index_name.to_lowercase());
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the upsert calls received so far.
    pub fn upsert_calls(&self) -> Vec<ClientCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ClientCall::Upsert { .. }))
            .collect()
    }

    /// Only the delete calls received so far.
    pub fn delete_calls(&self) -> Vec<ClientCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ClientCall::Delete { .. }))
            .collect()
    }

    /// Fetch a stored document.
    pub fn document(&self, index_name: &str, id: &str) -> Option<SearchDocument> {
        self.indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&index_name.to_lowercase())
            .and_then(|idx| idx.documents.get(id).cloned())
    }

    /// Number of documents stored for an index.
    pub fn document_count(&self, index_name: &str) -> usize {
        self.indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&index_name.to_lowercase())
            .map(|idx| idx.documents.len())
            .unwrap_or(0)
    }

    fn record(&self, call: ClientCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn check_available(&self, index_name: &str) -> Result<(), SearchError> {
        let failing = self.failing.read().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(&index_name.to_lowercase()) {
            return Err(SearchError::Rejected {
                index: index_name.to_string(),
                reason: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SearchClient for InMemorySearchClient {
    async fn upsert_documents(
        &self,
        index_name: &str,
        documents: Vec<SearchDocument>,
    ) -> Result<usize, SearchError> {
        self.record(ClientCall::Upsert {
            index: index_name.to_string(),
            ids: documents.iter().map(|d| d.id.clone()).collect(),
        });
        self.check_available(index_name)?;

        let count = documents.len();
        let mut indexes = self.indexes.write().unwrap_or_else(PoisonError::into_inner);
        let index = indexes.entry(index_name.to_lowercase()).or_default();
        for doc in documents {
            index.documents.insert(doc.id.clone(), doc);
        }
        index.last_updated_at = Some(Utc::now());

        debug!(index = %index_name, count, "Upserted documents in memory");
        Ok(count)
    }

    async fn delete_documents(
        &self,
        index_name: &str,
        ids: Vec<String>,
    ) -> Result<usize, SearchError> {
        self.record(ClientCall::Delete {
            index: index_name.to_string(),
            ids: ids.clone(),
        });
        self.check_available(index_name)?;

        let count = ids.len();
        let mut indexes = self.indexes.write().unwrap_or_else(PoisonError::into_inner);
        let index = indexes.entry(index_name.to_lowercase()).or_default();
        for id in &ids {
            index.documents.remove(id);
        }
        index.last_updated_at = Some(Utc::now());

        debug!(index = %index_name, count, "Deleted documents in memory");
        Ok(count)
    }

    async fn get_statistics(&self, index_name: &str) -> Result<IndexStatistics, SearchError> {
        self.record(ClientCall::Statistics {
            index: index_name.to_string(),
        });
        let indexes = self.indexes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(indexes
            .get(&index_name.to_lowercase())
            .map(|idx| IndexStatistics {
                entry_count: idx.documents.len() as u64,
                last_updated_at: idx.last_updated_at,
            })
            .unwrap_or_default())
    }

    async fn rebuild_index(&self, index_name: &str) -> Result<(), SearchError> {
        self.record(ClientCall::Rebuild {
            index: index_name.to_string(),
        });
        self.check_available(index_name)?;

        let mut indexes = self.indexes.write().unwrap_or_else(PoisonError::into_inner);
        let index = indexes.entry(index_name.to_lowercase()).or_default();
        index.documents.clear();
        index.last_updated_at = Some(Utc::now());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentFields;

    fn doc(id: &str) -> SearchDocument {
        let mut fields = DocumentFields::new();
        fields.insert("title".into(), serde_json::json!(format!("Doc {id}")));
        SearchDocument::new(id, fields)
    }

    #[tokio::test]
    async fn test_upsert_and_delete() {
        let client = InMemorySearchClient::new();
        client
            .upsert_documents("Products", vec![doc("1_en"), doc("2_en")])
            .await
            .unwrap();
        assert_eq!(client.document_count("products"), 2);

        client
            .delete_documents("Products", vec!["1_en".into()])
            .await
            .unwrap();
        assert_eq!(client.document_count("Products"), 1);
        assert!(client.document("Products", "2_en").is_some());

        assert_eq!(client.upsert_calls().len(), 1);
        assert_eq!(client.delete_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_statistics() {
        let client = InMemorySearchClient::new();
        let stats = client.get_statistics("Empty").await.unwrap();
        assert_eq!(stats.entry_count, 0);
        assert!(stats.last_updated_at.is_none());

        client
            .upsert_documents("Products", vec![doc("1_en")])
            .await
            .unwrap();
        let stats = client.get_statistics("Products").await.unwrap();
        assert_eq!(stats.entry_count, 1);
        assert!(stats.last_updated_at.is_some());
    }

    #[tokio::test]
    async fn test_failing_index() {
        let client = InMemorySearchClient::new();
        client.fail_index("Products");

        let result = client.upsert_documents("Products", vec![doc("1_en")]).await;
        assert!(matches!(result, Err(SearchError::Rejected { .. })));
        assert_eq!(client.document_count("Products"), 0);
        // The attempt is still recorded
        assert_eq!(client.upsert_calls().len(), 1);

        client.recover_index("products");
        client
            .upsert_documents("Products", vec![doc("1_en")])
            .await
            .unwrap();
        assert_eq!(client.document_count("Products"), 1);
    }

    #[tokio::test]
    async fn test_rebuild_clears_documents() {
        let client = InMemorySearchClient::new();
        client
            .upsert_documents("Products", vec![doc("1_en"), doc("2_en")])
            .await
            .unwrap();
        client.rebuild_index("Products").await.unwrap();
        assert_eq!(client.document_count("Products"), 0);
    }
}
