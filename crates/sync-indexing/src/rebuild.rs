//! Manual index rebuild.
//!
//! Clears one external index and repopulates it from a full enumeration of
//! the content repository. Rebuilds bypass the task queue and run alongside
//! the periodic worker; tasks the worker flushes in the meantime are ordinary
//! idempotent upserts and deletes.

use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sync_types::{ContentItem, QueueTask};

use crate::error::IndexingError;
use crate::matcher::is_match;
use crate::processor::{BatchProcessor, ProcessResult};

/// Enumerates every content item for a rebuild.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// All items currently in the repository, in any order.
    async fn load_items(&self) -> Result<Vec<ContentItem>, IndexingError>;
}

#[async_trait]
impl ContentSource for Vec<ContentItem> {
    async fn load_items(&self) -> Result<Vec<ContentItem>, IndexingError> {
        Ok(self.clone())
    }
}

/// Configuration for rebuild operations.
#[derive(Debug, Clone)]
pub struct RebuildConfig {
    /// Number of items pushed per bulk upsert.
    pub batch_size: usize,
    /// Whether to clear the external index before repopulating it.
    pub clear_first: bool,
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            clear_first: true,
        }
    }
}

impl RebuildConfig {
    /// Set the batch size (minimum 1).
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set whether to clear the index first.
    pub fn with_clear_first(mut self, clear: bool) -> Self {
        self.clear_first = clear;
        self
    }
}

/// Progress tracking for rebuild operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildProgress {
    /// Items enumerated from the source.
    pub scanned: u64,
    /// Items that matched the index.
    pub matched: u64,
    /// Items that were malformed.
    pub invalid: u64,
    /// Accumulated batch processor counts.
    pub processed: ProcessResult,
    /// Whether every batch was attempted.
    pub completed: bool,
}

/// Trait for receiving rebuild progress updates.
pub trait ProgressCallback: Send + Sync {
    /// Called after each batch is processed.
    fn on_progress(&self, progress: &RebuildProgress);
}

/// A no-op progress callback.
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_progress(&self, _progress: &RebuildProgress) {}
}

/// Logs progress at info level after each batch.
pub struct LoggingProgressCallback;

impl ProgressCallback for LoggingProgressCallback {
    fn on_progress(&self, progress: &RebuildProgress) {
        info!(
            matched = progress.matched,
            attempted = progress.processed.attempted,
            failed_batches = progress.processed.failed_batches,
            "Rebuild progress"
        );
    }
}

/// Result of a rebuild operation.
#[derive(Debug, Clone)]
pub struct RebuildResult {
    pub index_name: String,
    pub progress: RebuildProgress,
    /// Time taken in milliseconds.
    pub elapsed_ms: u64,
}

/// Rebuild the index registered as `index_name` from `source`.
///
/// # Errors
///
/// Fails if the index is not registered, the source cannot be read, the
/// external index cannot be cleared, or `cancel` fires before the last batch.
pub async fn rebuild_index(
    processor: &BatchProcessor,
    index_name: &str,
    source: &dyn ContentSource,
    config: &RebuildConfig,
    progress_callback: &dyn ProgressCallback,
    cancel: &CancellationToken,
) -> Result<RebuildResult, IndexingError> {
    let start = Instant::now();
    let index = processor
        .registry()
        .get_index(index_name)?
        .ok_or_else(|| IndexingError::UnknownIndex(index_name.to_string()))?;

    info!(index = %index.name, client = processor.client().name(), "Starting index rebuild");

    let items = source.load_items().await?;
    if cancel.is_cancelled() {
        return Err(IndexingError::Cancelled);
    }

    if config.clear_first {
        processor.client().rebuild_index(&index.name).await?;
        debug!(index = %index.name, "Cleared external index");
    }

    let mut progress = RebuildProgress::default();
    let mut tasks = Vec::new();
    for item in items {
        progress.scanned += 1;
        match is_match(&item, &index) {
            Ok(true) => {
                progress.matched += 1;
                tasks.push(QueueTask::upsert(index.name.clone(), item));
            }
            Ok(false) => {}
            Err(e) => {
                warn!(
                    index = %index.name,
                    item_id = item.item_id,
                    error = %e,
                    "Skipping malformed item"
                );
                progress.invalid += 1;
            }
        }
    }

    let batch_size = config.batch_size.max(1);
    let mut remaining = tasks.into_iter().peekable();
    while remaining.peek().is_some() {
        let batch: Vec<QueueTask> = remaining.by_ref().take(batch_size).collect();
        let batch_result = processor.process(batch, cancel).await;
        progress.processed.merge(&batch_result);
        progress_callback.on_progress(&progress);

        if batch_result.cancelled {
            warn!(
                index = %index.name,
                attempted = progress.processed.attempted,
                "Rebuild cancelled"
            );
            return Err(IndexingError::Cancelled);
        }
    }

    progress.completed = true;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        index = %index.name,
        scanned = progress.scanned,
        matched = progress.matched,
        upserted = progress.processed.documents_upserted,
        failed_batches = progress.processed.failed_batches,
        elapsed_ms,
        "Index rebuild complete"
    );

    Ok(RebuildResult {
        index_name: index.name.clone(),
        progress,
        elapsed_ms,
    })
}
