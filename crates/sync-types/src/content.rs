//! Content items and repository change notifications.
//!
//! A [`ContentItem`] is the opaque reference to a piece of repository content
//! that travels through the queue until an indexing strategy turns it into a
//! search document. Page items carry a tree path; reusable items do not.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SyncError;

/// Kind of change reported by the content repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Item was created or published for the first time.
    #[serde(alias = "created")]
    Published,
    /// Item was updated in place.
    Updated,
    /// Item was deleted or unpublished.
    Deleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Published => "published",
            EventKind::Updated => "updated",
            EventKind::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a content item in the source repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Numeric repository identifier.
    pub item_id: i64,

    /// Stable identifier across environments.
    #[serde(default = "Uuid::nil")]
    pub guid: Uuid,

    /// Schema/type name of the item.
    pub content_type: String,

    /// Language variant of the item.
    pub language: String,

    /// Hierarchical location. `None` for reusable (non-page) items.
    #[serde(default)]
    pub tree_path: Option<String>,

    /// Snapshot of the item's field values at notification time.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl ContentItem {
    /// Create a page-like item located at `tree_path`.
    pub fn page(
        item_id: i64,
        content_type: impl Into<String>,
        language: impl Into<String>,
        tree_path: impl Into<String>,
    ) -> Self {
        Self {
            item_id,
            guid: Uuid::new_v4(),
            content_type: content_type.into(),
            language: language.into(),
            tree_path: Some(tree_path.into()),
            properties: BTreeMap::new(),
        }
    }

    /// Create a reusable item, which has no place in the content tree.
    pub fn reusable(
        item_id: i64,
        content_type: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            item_id,
            guid: Uuid::new_v4(),
            content_type: content_type.into(),
            language: language.into(),
            tree_path: None,
            properties: BTreeMap::new(),
        }
    }

    /// Set the guid.
    pub fn with_guid(mut self, guid: Uuid) -> Self {
        self.guid = guid;
        self
    }

    /// Add a property value to the snapshot.
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Whether this item lives in the content tree.
    pub fn is_page(&self) -> bool {
        self.tree_path.is_some()
    }

    /// Reject items missing the fields every matching rule depends on.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.content_type.trim().is_empty() {
            return Err(SyncError::missing("content_type"));
        }
        if self.language.trim().is_empty() {
            return Err(SyncError::missing("language"));
        }
        if let Some(path) = &self.tree_path {
            if path.trim().is_empty() {
                return Err(SyncError::missing("tree_path"));
            }
        }
        Ok(())
    }
}

/// A single change reported by the content repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    /// The item that changed.
    #[serde(flatten)]
    pub item: ContentItem,

    /// What happened to it.
    pub event: EventKind,
}

impl ChangeNotification {
    pub fn new(item: ContentItem, event: EventKind) -> Self {
        Self { item, event }
    }

    pub fn published(item: ContentItem) -> Self {
        Self::new(item, EventKind::Published)
    }

    pub fn updated(item: ContentItem) -> Self {
        Self::new(item, EventKind::Updated)
    }

    pub fn deleted(item: ContentItem) -> Self {
        Self::new(item, EventKind::Deleted)
    }

    /// Parse a notification from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        let notification: ChangeNotification = serde_json::from_str(json)?;
        Ok(notification)
    }
}
