//! Task translator.
//!
//! Turns one repository change notification into zero or more queue tasks,
//! one per registered index the item matches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use sync_types::{ChangeNotification, QueueTask, TaskType};

use crate::error::IndexingError;
use crate::matcher::is_match;
use crate::registry::IndexRegistry;

/// Converts change notifications into queue tasks.
pub struct TaskTranslator {
    registry: Arc<IndexRegistry>,
    enabled: AtomicBool,
}

impl TaskTranslator {
    pub fn new(registry: Arc<IndexRegistry>) -> Self {
        Self {
            registry,
            enabled: AtomicBool::new(true),
        }
    }

    /// Toggle the global indexing switch.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Produce one task per matching index.
    ///
    /// Returns an empty list when indexing is disabled or nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for a malformed notification.
    pub fn translate(
        &self,
        notification: &ChangeNotification,
    ) -> Result<Vec<QueueTask>, IndexingError> {
        notification.item.validate()?;

        if !self.is_enabled() {
            trace!(item_id = notification.item.item_id, "Indexing disabled, ignoring change");
            return Ok(Vec::new());
        }

        let task_type = TaskType::from(notification.event);
        let snapshot = self.registry.snapshot();
        let mut tasks = Vec::new();

        for index in snapshot.iter() {
            if is_match(&notification.item, index)? {
                tasks.push(QueueTask::new(
                    index.name.clone(),
                    notification.item.clone(),
                    task_type,
                ));
            }
        }

        debug!(
            item_id = notification.item.item_id,
            event = %notification.event,
            matched = tasks.len(),
            "Translated change notification"
        );
        Ok(tasks)
    }
}
