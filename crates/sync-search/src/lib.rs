//! # sync-search
//!
//! Boundary to the external full-text search engine.
//!
//! The synchronization pipeline only ever talks to a [`SearchClient`]:
//! bulk upsert, bulk delete, statistics and rebuild. Two implementations
//! ship with the crate:
//! - [`TantivySearchClient`]: embedded Tantivy indexes, one directory per index
//! - [`InMemorySearchClient`]: in-process store that records every call,
//!   used by tests and dry runs

pub mod client;
pub mod document;
pub mod error;
pub mod index;
pub mod memory;
pub mod schema;
pub mod tantivy_client;

pub use client::SearchClient;
pub use document::{DocumentFields, IndexStatistics, SearchDocument};
pub use error::SearchError;
pub use index::{DocumentIndex, DocumentIndexConfig};
pub use memory::{ClientCall, InMemorySearchClient};
pub use schema::{build_document_schema, DocumentSchema};
pub use tantivy_client::TantivySearchClient;
