//! # sync-types
//!
//! Shared domain types for the search synchronization pipeline.
//!
//! This crate defines the core data structures used throughout the system:
//! - Index definitions: which content an external index cares about
//! - Content items and change notifications from the content repository
//! - Queue tasks: pending upsert/delete operations against one index
//! - Settings: layered configuration

pub mod config;
pub mod content;
pub mod error;
pub mod index;
pub mod task;

pub use config::Settings;
pub use content::{ChangeNotification, ContentItem, EventKind};
pub use error::SyncError;
pub use index::{IncludedPath, IndexDefinition, WILDCARD_MARKER};
pub use task::{ItemKey, QueueTask, TaskType};
