//! Indexing service facade.
//!
//! Bundles the registry, translator and queue behind the three operations the
//! rest of the application calls: enqueue a change, request a flush, and ask
//! whether a change matches an index. The background worker waits on the
//! flush signal exposed here.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::debug;

use sync_types::{ChangeNotification, SyncError};

use crate::error::IndexingError;
use crate::matcher::is_match;
use crate::queue::TaskQueue;
use crate::registry::IndexRegistry;
use crate::translator::TaskTranslator;

/// Entry point for content-change producers.
pub struct IndexingService {
    registry: Arc<IndexRegistry>,
    translator: TaskTranslator,
    queue: Arc<TaskQueue>,
    flush: Arc<Notify>,
}

impl IndexingService {
    pub fn new(registry: Arc<IndexRegistry>) -> Self {
        let queue = Arc::new(TaskQueue::new(registry.clone()));
        Self {
            translator: TaskTranslator::new(registry.clone()),
            registry,
            queue,
            flush: Arc::new(Notify::new()),
        }
    }

    /// Set the initial state of the global indexing switch.
    pub fn with_indexing_enabled(self, enabled: bool) -> Self {
        self.translator.set_enabled(enabled);
        self
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Signal notified by [`flush_now`](Self::flush_now).
    pub fn flush_signal(&self) -> Arc<Notify> {
        self.flush.clone()
    }

    /// Translate a change and buffer the resulting tasks.
    ///
    /// Never touches the network. Returns the number of tasks enqueued, which
    /// is zero when indexing is disabled or no index matches.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for a malformed notification, or
    /// [`IndexingError::UnknownIndex`] if an index was removed between
    /// translation and enqueue.
    pub fn enqueue_for_index(
        &self,
        notification: &ChangeNotification,
    ) -> Result<usize, IndexingError> {
        let tasks = self.translator.translate(notification)?;
        if tasks.is_empty() {
            return Ok(0);
        }
        let count = self.queue.enqueue_all(tasks)?;
        debug!(
            item_id = notification.item.item_id,
            tasks = count,
            queued = self.queue.len(),
            "Enqueued change"
        );
        Ok(count)
    }

    /// Ask the worker to drain the queue as soon as possible.
    ///
    /// Called at the end of each inbound request cycle. Signals coalesce: any
    /// number of calls before the worker wakes result in one drain.
    pub fn flush_now(&self) {
        self.flush.notify_one();
    }

    /// Whether `notification` matches the index registered as `index_name`.
    ///
    /// # Errors
    ///
    /// Fails on an empty index name, an unregistered index, or a malformed
    /// notification.
    pub fn matches(
        &self,
        notification: &ChangeNotification,
        index_name: &str,
    ) -> Result<bool, IndexingError> {
        if index_name.trim().is_empty() {
            return Err(SyncError::missing("index name").into());
        }
        let index = self
            .registry
            .get_index(index_name)?
            .ok_or_else(|| IndexingError::UnknownIndex(index_name.to_string()))?;
        is_match(&notification.item, &index)
    }

    /// Toggle the global indexing switch at runtime.
    pub fn set_indexing_enabled(&self, enabled: bool) {
        self.translator.set_enabled(enabled);
    }

    pub fn is_indexing_enabled(&self) -> bool {
        self.translator.is_enabled()
    }
}
