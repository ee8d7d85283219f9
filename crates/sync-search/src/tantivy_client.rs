//! Search client backed by embedded Tantivy indexes.
//!
//! Each index name maps to its own directory below the base path. Names are
//! case-insensitive, and distinct names always get distinct directories.
//! Indexes are opened lazily on first use and kept open for the lifetime of
//! the client. Tantivy work is blocking, so every operation runs on the
//! blocking pool.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::SearchClient;
use crate::document::{IndexStatistics, SearchDocument};
use crate::error::SearchError;
use crate::index::{DocumentIndex, DocumentIndexConfig};

/// [`SearchClient`] writing to local Tantivy indexes.
pub struct TantivySearchClient {
    base_path: PathBuf,
    writer_memory_mb: usize,
    /// Open indexes keyed by directory name
    indexes: RwLock<HashMap<String, Arc<DocumentIndex>>>,
}

impl TantivySearchClient {
    /// Create a client rooted at `base_path`. Directories are created on demand.
    pub fn new(base_path: impl Into<PathBuf>, writer_memory_mb: usize) -> Self {
        Self {
            base_path: base_path.into(),
            writer_memory_mb,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Directory holding the given index.
    pub fn index_path(&self, index_name: &str) -> PathBuf {
        self.base_path.join(directory_name(index_name))
    }

    /// Open (or create) the index for `index_name`.
    pub fn open_index(&self, index_name: &str) -> Result<Arc<DocumentIndex>, SearchError> {
        let key = directory_name(index_name);
        if let Some(index) = self
            .indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(index.clone());
        }

        let mut indexes = self.indexes.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have opened it while we waited for the write lock
        if let Some(index) = indexes.get(&key) {
            return Ok(index.clone());
        }

        let config = DocumentIndexConfig::new(self.base_path.join(&key))
            .with_memory_mb(self.writer_memory_mb);
        let index = Arc::new(DocumentIndex::open_or_create(config)?);
        indexes.insert(key, index.clone());
        info!(index = %index_name, "Opened search index");
        Ok(index)
    }

    async fn run_blocking<T, F>(&self, index_name: &str, op: F) -> Result<T, SearchError>
    where
        T: Send + 'static,
        F: FnOnce(&DocumentIndex) -> Result<T, SearchError> + Send + 'static,
    {
        let index = self.open_index(index_name)?;
        tokio::task::spawn_blocking(move || op(&index))
            .await
            .map_err(|e| SearchError::Task(e.to_string()))?
    }
}

/// File-system safe directory name for an index.
///
/// The lowercased name keeps ASCII letters, digits and `-`; every other byte
/// is written as `_` plus two hex digits, so two names share a directory only
/// if they are equal ignoring case.
fn directory_name(index_name: &str) -> String {
    let mut name = String::new();
    for byte in index_name.to_lowercase().bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("_{byte:02x}"));
        }
    }
    name
}

#[async_trait]
impl SearchClient for TantivySearchClient {
    async fn upsert_documents(
        &self,
        index_name: &str,
        documents: Vec<SearchDocument>,
    ) -> Result<usize, SearchError> {
        if documents.is_empty() {
            return Ok(0);
        }
        let count = self
            .run_blocking(index_name, move |index| index.upsert(&documents))
            .await?;
        debug!(index = %index_name, count, "Upserted documents");
        Ok(count)
    }

    async fn delete_documents(
        &self,
        index_name: &str,
        ids: Vec<String>,
    ) -> Result<usize, SearchError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let count = self
            .run_blocking(index_name, move |index| index.delete(&ids))
            .await?;
        debug!(index = %index_name, count, "Deleted documents");
        Ok(count)
    }

    async fn get_statistics(&self, index_name: &str) -> Result<IndexStatistics, SearchError> {
        self.run_blocking(index_name, |index| {
            Ok(IndexStatistics {
                entry_count: index.num_docs(),
                last_updated_at: index.last_updated_at()?,
            })
        })
        .await
    }

    async fn rebuild_index(&self, index_name: &str) -> Result<(), SearchError> {
        self.run_blocking(index_name, |index| index.clear()).await
    }

    fn name(&self) -> &str {
        "tantivy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentFields;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(id: &str) -> SearchDocument {
        let mut fields = DocumentFields::new();
        fields.insert("title".into(), json!(format!("Title {id}")));
        SearchDocument::new(id, fields)
    }

    #[test]
    fn test_directory_name() {
        assert_eq!(directory_name("Products"), "products");
        assert_eq!(directory_name("PRODUCTS"), "products");
        assert_eq!(directory_name("My Index/2"), "my_20index_2f2");
        assert_eq!(directory_name("my_index"), "my_5findex");
        assert_eq!(directory_name("en-articles"), "en-articles");
        assert_eq!(directory_name("Café"), "caf_c3_a9");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_similar_names_get_separate_indexes() {
        let temp_dir = TempDir::new().unwrap();
        let client = TantivySearchClient::new(temp_dir.path(), 50);

        client
            .upsert_documents("My Index", vec![doc("1_en")])
            .await
            .unwrap();
        client
            .upsert_documents("my_index", vec![doc("2_en"), doc("3_en")])
            .await
            .unwrap();

        assert_ne!(client.index_path("My Index"), client.index_path("my_index"));
        assert_eq!(client.get_statistics("My Index").await.unwrap().entry_count, 1);
        assert_eq!(client.get_statistics("MY_INDEX").await.unwrap().entry_count, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_last_update_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let client = TantivySearchClient::new(temp_dir.path(), 50);
            let stats = client.get_statistics("Products").await.unwrap();
            assert!(stats.last_updated_at.is_none());

            client
                .upsert_documents("Products", vec![doc("1_en")])
                .await
                .unwrap();
        }

        let client = TantivySearchClient::new(temp_dir.path(), 50);
        let stats = client.get_statistics("Products").await.unwrap();
        assert_eq!(stats.entry_count, 1);
        assert!(stats.last_updated_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_delete_statistics() {
        let temp_dir = TempDir::new().unwrap();
        let client = TantivySearchClient::new(temp_dir.path(), 50);

        client
            .upsert_documents("Products", vec![doc("1_en"), doc("2_en")])
            .await
            .unwrap();
        let stats = client.get_statistics("Products").await.unwrap();
        assert_eq!(stats.entry_count, 2);
        assert!(stats.last_updated_at.is_some());

        client
            .delete_documents("Products", vec!["1_en".to_string()])
            .await
            .unwrap();
        let stats = client.get_statistics("products").await.unwrap();
        assert_eq!(stats.entry_count, 1);

        assert!(client.index_path("Products").join("meta.json").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rebuild_clears_index() {
        let temp_dir = TempDir::new().unwrap();
        let client = TantivySearchClient::new(temp_dir.path(), 50);

        client
            .upsert_documents("Articles", vec![doc("1_en")])
            .await
            .unwrap();
        client.rebuild_index("Articles").await.unwrap();

        let stats = client.get_statistics("Articles").await.unwrap();
        assert_eq!(stats.entry_count, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_batches_are_noops() {
        let temp_dir = TempDir::new().unwrap();
        let client = TantivySearchClient::new(temp_dir.path(), 50);

        assert_eq!(client.upsert_documents("Empty", vec![]).await.unwrap(), 0);
        assert_eq!(client.delete_documents("Empty", vec![]).await.unwrap(), 0);
        assert!(!client.index_path("Empty").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stored_payload_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let client = TantivySearchClient::new(temp_dir.path(), 50);

        client
            .upsert_documents("Products", vec![doc("9_en")])
            .await
            .unwrap();
        let index = client.open_index("Products").unwrap();
        let stored = index.get("9_en").unwrap().unwrap();
        assert_eq!(stored.fields.get("title"), Some(&json!("Title 9_en")));
    }
}
