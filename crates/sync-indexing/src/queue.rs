//! In-memory task queue.
//!
//! Many producers push tasks; a single consumer drains them. A drain swaps
//! the buffer for an empty one under the lock and processes the old contents
//! after releasing it, so producers are never held up by a running batch.
//! Nothing is persisted: tasks still buffered when the process exits are lost.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace};

use sync_types::{ItemKey, QueueTask};

use crate::error::IndexingError;
use crate::registry::IndexRegistry;

/// Concurrent, unbounded FIFO buffer of [`QueueTask`]s.
pub struct TaskQueue {
    registry: Arc<IndexRegistry>,
    buffer: Mutex<Vec<QueueTask>>,
    next_sequence: AtomicU64,
}

impl TaskQueue {
    pub fn new(registry: Arc<IndexRegistry>) -> Self {
        Self {
            registry,
            buffer: Mutex::new(Vec::new()),
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Add a task to the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`IndexingError::UnknownIndex`] if the task targets an index
    /// that is not currently registered.
    pub fn enqueue(&self, task: QueueTask) -> Result<(), IndexingError> {
        self.enqueue_all(vec![task]).map(|_| ())
    }

    /// Add several tasks, all or none.
    ///
    /// Every index name is checked against one registry snapshot before
    /// anything is buffered, so a concurrent registry change cannot leave a
    /// notification half queued.
    ///
    /// # Errors
    ///
    /// Returns [`IndexingError::UnknownIndex`] for the first task whose index
    /// is not registered; nothing is queued in that case.
    pub fn enqueue_all(&self, tasks: Vec<QueueTask>) -> Result<usize, IndexingError> {
        let snapshot = self.registry.snapshot();
        if let Some(task) = tasks.iter().find(|t| snapshot.get(&t.index_name).is_none()) {
            return Err(IndexingError::UnknownIndex(task.index_name.clone()));
        }

        let count = tasks.len();
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        for mut task in tasks {
            // Assigned under the lock so sequence order equals buffer order
            task.sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
            trace!(
                index = %task.index_name,
                key = %task.item_key,
                task_type = %task.task_type,
                sequence = task.sequence,
                "Enqueued task"
            );
            buffer.push(task);
        }
        Ok(count)
    }

    /// Take every buffered task, leaving a fresh empty buffer behind.
    pub fn drain(&self) -> Vec<QueueTask> {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *buffer)
    }

    /// Drain and collapse duplicates in one step.
    pub fn drain_collapsed(&self) -> Vec<QueueTask> {
        let drained = self.drain();
        let before = drained.len();
        let collapsed = collapse_tasks(drained);
        if before > 0 {
            debug!(drained = before, collapsed = collapsed.len(), "Drained task queue");
        }
        collapsed
    }

    pub fn len(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collapse tasks sharing `(index name, item key)` to a single task.
///
/// The task enqueued last wins. A DELETE therefore supersedes every upsert
/// queued before it, and an upsert queued after a DELETE (the item was
/// published again) supersedes the DELETE. Output is ordered by the winning
/// tasks' sequence numbers.
pub fn collapse_tasks(tasks: Vec<QueueTask>) -> Vec<QueueTask> {
    let mut latest: HashMap<(String, ItemKey), QueueTask> = HashMap::with_capacity(tasks.len());

    for task in tasks {
        let key = task.dedup_key();
        match latest.get(&key) {
            Some(existing) if existing.sequence > task.sequence => {}
            _ => {
                latest.insert(key, task);
            }
        }
    }

    let mut collapsed: Vec<QueueTask> = latest.into_values().collect();
    collapsed.sort_by_key(|t| t.sequence);
    collapsed
}
