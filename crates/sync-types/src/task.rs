//! Queue tasks.
//!
//! A [`QueueTask`] is one pending operation against one index. Tasks live in
//! memory only; a process restart drops whatever was not flushed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{ContentItem, EventKind};

/// Operation a task performs against the external index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Create or replace the document.
    Upsert,
    /// Remove the document.
    Delete,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Upsert => "upsert",
            TaskType::Delete => "delete",
        }
    }
}

impl From<EventKind> for TaskType {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Published | EventKind::Updated => TaskType::Upsert,
            EventKind::Deleted => TaskType::Delete,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an item within one index; doubles as the external document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKey {
    /// Page item: one document per language variant.
    Page { item_id: i64, language: String },
    /// Reusable item: one document per content type.
    Reusable { item_id: i64, content_type: String },
}

impl ItemKey {
    /// Derive the key for an item.
    pub fn for_item(item: &ContentItem) -> Self {
        if item.is_page() {
            ItemKey::Page {
                item_id: item.item_id,
                language: item.language.to_lowercase(),
            }
        } else {
            ItemKey::Reusable {
                item_id: item.item_id,
                content_type: item.content_type.to_lowercase(),
            }
        }
    }

    /// External document id, e.g. `"42_en"`.
    pub fn document_id(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKey::Page { item_id, language } => write!(f, "{item_id}_{language}"),
            ItemKey::Reusable {
                item_id,
                content_type,
            } => write!(f, "{item_id}_{content_type}"),
        }
    }
}

/// A pending operation for one item against one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueTask {
    /// Target index name, as registered.
    pub index_name: String,

    /// Item identity within the index.
    pub item_key: ItemKey,

    /// What to do with the document.
    pub task_type: TaskType,

    /// Source item, resolved into a document at processing time.
    pub item: ContentItem,

    /// Enqueue order, assigned by the queue. Later tasks have larger values.
    #[serde(default)]
    pub sequence: u64,

    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

impl QueueTask {
    pub fn new(index_name: impl Into<String>, item: ContentItem, task_type: TaskType) -> Self {
        Self {
            index_name: index_name.into(),
            item_key: ItemKey::for_item(&item),
            task_type,
            item,
            sequence: 0,
            created_at: Utc::now(),
        }
    }

    pub fn upsert(index_name: impl Into<String>, item: ContentItem) -> Self {
        Self::new(index_name, item, TaskType::Upsert)
    }

    pub fn delete(index_name: impl Into<String>, item: ContentItem) -> Self {
        Self::new(index_name, item, TaskType::Delete)
    }

    /// Key used to collapse duplicate tasks: (lowercased index name, item key).
    pub fn dedup_key(&self) -> (String, ItemKey) {
        (self.index_name.to_lowercase(), self.item_key.clone())
    }
}
