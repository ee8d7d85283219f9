//! Tantivy index management.
//!
//! A [`DocumentIndex`] owns one on-disk Tantivy index together with its
//! writer and reader. Writes are committed per batch, so every bulk call
//! from the pipeline becomes visible as one unit. Each commit records its
//! time as the commit payload, so the last update survives a restart.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tantivy::collector::TopDocs;
use tantivy::query::TermQuery;
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info};

use crate::document::{DocumentFields, SearchDocument};
use crate::error::SearchError;
use crate::schema::{build_document_schema, DocumentSchema};

/// Default memory budget for IndexWriter (50MB)
const DEFAULT_WRITER_MEMORY_MB: usize = 50;

/// Document index configuration
#[derive(Debug, Clone)]
pub struct DocumentIndexConfig {
    /// Path to index directory
    pub index_path: PathBuf,
    /// Memory budget for writer in MB
    pub writer_memory_mb: usize,
}

impl DocumentIndexConfig {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            writer_memory_mb: DEFAULT_WRITER_MEMORY_MB,
        }
    }

    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb;
        self
    }
}

/// One Tantivy index with shared writer access.
pub struct DocumentIndex {
    index: Index,
    schema: DocumentSchema,
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    config: DocumentIndexConfig,
}

impl DocumentIndex {
    /// Open existing index or create new one.
    pub fn open_or_create(config: DocumentIndexConfig) -> Result<Self, SearchError> {
        let index = open_or_create_index(&config.index_path)?;
        let schema = DocumentSchema::from_schema(index.schema())?;

        let memory_budget = config.writer_memory_mb * 1024 * 1024;
        let writer = index.writer(memory_budget)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        info!(path = ?config.index_path, "Opened document index");

        Ok(Self {
            index,
            schema,
            writer: Mutex::new(writer),
            reader,
            config,
        })
    }

    /// Get the document schema
    pub fn schema(&self) -> &DocumentSchema {
        &self.schema
    }

    /// Get the underlying Tantivy index
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Get the index path
    pub fn path(&self) -> &Path {
        &self.config.index_path
    }

    /// Replace documents by id and commit.
    pub fn upsert(&self, documents: &[SearchDocument]) -> Result<usize, SearchError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))?;

        for document in documents {
            let payload = serde_json::to_string(&document.fields)?;
            writer.delete_term(Term::from_field_text(self.schema.doc_id, &document.id));
            writer.add_document(doc!(
                self.schema.doc_id => document.id.as_str(),
                self.schema.text => document.searchable_text(),
                self.schema.payload => payload
            ))?;
        }

        let opstamp = commit_stamped(&mut writer)?;
        self.reader.reload()?;
        debug!(count = documents.len(), opstamp, "Committed upserts");
        Ok(documents.len())
    }

    /// Delete documents by id and commit.
    pub fn delete(&self, ids: &[String]) -> Result<usize, SearchError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))?;

        for id in ids {
            writer.delete_term(Term::from_field_text(self.schema.doc_id, id));
        }

        let opstamp = commit_stamped(&mut writer)?;
        self.reader.reload()?;
        debug!(count = ids.len(), opstamp, "Committed deletes");
        Ok(ids.len())
    }

    /// Remove every document and commit.
    pub fn clear(&self) -> Result<(), SearchError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))?;

        writer.delete_all_documents()?;
        let opstamp = commit_stamped(&mut writer)?;
        self.reader.reload()?;
        info!(path = ?self.config.index_path, opstamp, "Cleared document index");
        Ok(())
    }

    /// Number of live documents as of the last commit.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Time of the last commit, read from the on-disk index metadata.
    ///
    /// `None` for an index that was never written to.
    pub fn last_updated_at(&self) -> Result<Option<DateTime<Utc>>, SearchError> {
        let metas = self.index.load_metas()?;
        let Some(payload) = metas.payload else {
            return Ok(None);
        };
        let stamp = DateTime::parse_from_rfc3339(&payload)
            .map_err(|e| SearchError::Metadata(format!("bad commit payload: {e}")))?;
        Ok(Some(stamp.with_timezone(&Utc)))
    }

    /// Look up a document by id.
    pub fn get(&self, id: &str) -> Result<Option<SearchDocument>, SearchError> {
        let searcher = self.reader.searcher();
        let query = TermQuery::new(
            Term::from_field_text(self.schema.doc_id, id),
            IndexRecordOption::Basic,
        );
        let top = searcher.search(&query, &TopDocs::with_limit(1))?;

        let Some((_, address)) = top.into_iter().next() else {
            return Ok(None);
        };
        let stored: TantivyDocument = searcher.doc(address)?;
        let payload = stored
            .get_first(self.schema.payload)
            .and_then(|v| v.as_str())
            .unwrap_or("{}");
        let fields: DocumentFields = serde_json::from_str(payload)?;
        Ok(Some(SearchDocument::new(id, fields)))
    }
}

/// Commit pending operations with the current time as payload.
fn commit_stamped(writer: &mut IndexWriter) -> Result<u64, SearchError> {
    let mut prepared = writer.prepare_commit()?;
    prepared.set_payload(&Utc::now().to_rfc3339());
    Ok(prepared.commit()?)
}

/// Open an existing index or create a new one.
///
/// Uses MmapDirectory for persistence.
pub fn open_or_create_index(path: &Path) -> Result<Index, SearchError> {
    if path.join("meta.json").exists() {
        debug!(path = ?path, "Opening existing index");
        let index = Index::open_in_dir(path)?;
        Ok(index)
    } else {
        info!(path = ?path, "Creating new index");
        std::fs::create_dir_all(path)?;
        let schema = build_document_schema();
        let index = Index::create_in_dir(path, schema.schema().clone())?;
        Ok(index)
    }
}
