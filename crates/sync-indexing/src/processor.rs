//! Batch processor.
//!
//! Groups drained tasks by index and operation, resolves upsert payloads
//! through the index's strategy, and issues one bulk call per group against
//! the search client. Groups are independent: a rejected batch is logged and
//! the remaining groups are still attempted. Nothing is retried.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sync_search::{SearchClient, SearchDocument, SearchError};
use sync_types::{IndexDefinition, QueueTask, TaskType};

use crate::registry::IndexRegistry;
use crate::strategy::StrategyRegistry;

/// Outcome of processing one set of drained tasks.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Tasks that were part of an attempted bulk call.
    pub attempted: usize,
    /// Bulk calls that succeeded.
    pub succeeded_batches: usize,
    /// Bulk calls that failed.
    pub failed_batches: usize,
    /// Tasks dropped before a call: item no longer qualifies, index gone,
    /// strategy missing or failing.
    pub skipped: usize,
    /// Documents written by successful upsert calls.
    pub documents_upserted: usize,
    /// Ids submitted by successful delete calls.
    pub documents_deleted: usize,
    /// Whether processing stopped early on cancellation.
    pub cancelled: bool,
}

impl ProcessResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: &ProcessResult) {
        self.attempted += other.attempted;
        self.succeeded_batches += other.succeeded_batches;
        self.failed_batches += other.failed_batches;
        self.skipped += other.skipped;
        self.documents_upserted += other.documents_upserted;
        self.documents_deleted += other.documents_deleted;
        self.cancelled |= other.cancelled;
    }

    /// Whether any bulk call failed.
    pub fn has_failures(&self) -> bool {
        self.failed_batches > 0
    }

    /// Total number of tasks handled (attempted + skipped).
    pub fn total(&self) -> usize {
        self.attempted + self.skipped
    }
}

/// Tasks for one index, split by operation.
#[derive(Default)]
struct IndexGroup {
    name: String,
    upserts: Vec<QueueTask>,
    deletes: Vec<QueueTask>,
}

/// Turns queue tasks into bulk search-client calls.
pub struct BatchProcessor {
    registry: Arc<IndexRegistry>,
    strategies: Arc<StrategyRegistry>,
    client: Arc<dyn SearchClient>,
}

impl BatchProcessor {
    pub fn new(
        registry: Arc<IndexRegistry>,
        strategies: Arc<StrategyRegistry>,
        client: Arc<dyn SearchClient>,
    ) -> Self {
        Self {
            registry,
            strategies,
            client,
        }
    }

    pub fn client(&self) -> &Arc<dyn SearchClient> {
        &self.client
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    /// Process already-collapsed tasks.
    ///
    /// Stops between (or during) bulk calls once `cancel` fires; calls already
    /// completed are kept.
    pub async fn process(&self, tasks: Vec<QueueTask>, cancel: &CancellationToken) -> ProcessResult {
        let mut result = ProcessResult::new();
        if tasks.is_empty() {
            return result;
        }

        let total = tasks.len();
        let groups = group_by_index(tasks);
        let snapshot = self.registry.snapshot();

        for group in groups.into_values() {
            if cancel.is_cancelled() {
                result.cancelled = true;
                break;
            }

            let Some(definition) = snapshot.get(&group.name).cloned() else {
                // Index removed between enqueue and processing
                warn!(
                    index = %group.name,
                    count = group.upserts.len() + group.deletes.len(),
                    "Dropping tasks for unregistered index"
                );
                result.skipped += group.upserts.len() + group.deletes.len();
                continue;
            };

            if !group.deletes.is_empty() {
                let group_result = self.process_deletes(&definition, group.deletes, cancel).await;
                result.merge(&group_result);
            }
            if !group.upserts.is_empty() && !result.cancelled {
                let group_result = self.process_upserts(&definition, group.upserts, cancel).await;
                result.merge(&group_result);
            }
        }

        info!(
            tasks = total,
            attempted = result.attempted,
            skipped = result.skipped,
            succeeded_batches = result.succeeded_batches,
            failed_batches = result.failed_batches,
            cancelled = result.cancelled,
            "Processed task batch"
        );
        result
    }

    async fn process_deletes(
        &self,
        index: &IndexDefinition,
        tasks: Vec<QueueTask>,
        cancel: &CancellationToken,
    ) -> ProcessResult {
        let mut result = ProcessResult::new();
        let ids: Vec<String> = tasks.iter().map(|t| t.item_key.document_id()).collect();
        let count = ids.len();

        debug!(index = %index.name, count, "Deleting documents");
        result.attempted = count;

        match self
            .call(cancel, self.client.delete_documents(&index.name, ids))
            .await
        {
            Some(Ok(deleted)) => {
                result.succeeded_batches = 1;
                result.documents_deleted = deleted;
            }
            Some(Err(e)) => {
                warn!(
                    index = %index.name,
                    operation = "delete",
                    count,
                    error = %e,
                    "Bulk delete failed"
                );
                result.failed_batches = 1;
            }
            None => result.cancelled = true,
        }
        result
    }

    async fn process_upserts(
        &self,
        index: &IndexDefinition,
        tasks: Vec<QueueTask>,
        cancel: &CancellationToken,
    ) -> ProcessResult {
        let mut result = ProcessResult::new();

        let strategy = match self.strategies.get(&index.strategy_name) {
            Ok(strategy) => strategy,
            Err(e) => {
                warn!(index = %index.name, count = tasks.len(), error = %e, "Skipping upserts");
                result.skipped = tasks.len();
                return result;
            }
        };

        let mut documents = Vec::with_capacity(tasks.len());
        for task in &tasks {
            match strategy.map_to_document(&task.item, index).await {
                Ok(Some(fields)) => {
                    documents.push(SearchDocument::new(task.item_key.document_id(), fields));
                }
                Ok(None) => {
                    debug!(index = %index.name, key = %task.item_key, "Item no longer qualifies");
                    result.skipped += 1;
                }
                Err(e) => {
                    warn!(
                        index = %index.name,
                        key = %task.item_key,
                        strategy = %strategy.name(),
                        error = %e,
                        "Failed to build document"
                    );
                    result.skipped += 1;
                }
            }
        }

        if documents.is_empty() {
            return result;
        }

        let count = documents.len();
        debug!(index = %index.name, count, "Upserting documents");
        result.attempted = count;

        match self
            .call(cancel, self.client.upsert_documents(&index.name, documents))
            .await
        {
            Some(Ok(written)) => {
                result.succeeded_batches = 1;
                result.documents_upserted = written;
            }
            Some(Err(e)) => {
                warn!(
                    index = %index.name,
                    operation = "upsert",
                    count,
                    error = %e,
                    "Bulk upsert failed"
                );
                result.failed_batches = 1;
            }
            None => result.cancelled = true,
        }
        result
    }

    /// Await a client call unless cancellation wins the race.
    async fn call<F>(&self, cancel: &CancellationToken, fut: F) -> Option<Result<usize, SearchError>>
    where
        F: std::future::Future<Output = Result<usize, SearchError>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = fut => Some(outcome),
        }
    }
}

/// Group tasks by lowercased index name, keeping the first spelling seen.
fn group_by_index(tasks: Vec<QueueTask>) -> BTreeMap<String, IndexGroup> {
    let mut groups: BTreeMap<String, IndexGroup> = BTreeMap::new();
    for task in tasks {
        let group = groups
            .entry(task.index_name.to_lowercase())
            .or_insert_with(|| IndexGroup {
                name: task.index_name.clone(),
                ..Default::default()
            });
        match task.task_type {
            TaskType::Upsert => group.upserts.push(task),
            TaskType::Delete => group.deletes.push(task),
        }
    }
    groups
}
