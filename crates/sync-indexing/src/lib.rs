//! Search synchronization pipeline.
//!
//! This crate keeps external search indexes in step with repository content
//! changes.
//!
//! ## Key Components
//!
//! - [`IndexRegistry`]: copy-on-write store of [`IndexDefinition`](sync_types::IndexDefinition)s
//! - [`is_match`]: decides whether a content item belongs to an index
//! - [`TaskTranslator`]: change notification to queue tasks, one per matching index
//! - [`TaskQueue`]: concurrent buffer with drain-time deduplication
//! - [`BatchProcessor`]: groups drained tasks and issues bulk search-client calls
//! - [`IndexingService`]: facade used by content-change producers
//! - [`IndexingStrategy`]: maps a content item to search document fields
//! - [`DefinitionStore`]: TOML persistence for index definitions
//! - [`rebuild_index`]: clear and repopulate one index from a [`ContentSource`]
//!
//! ## Flow
//!
//! 1. A producer hands a change to [`IndexingService::enqueue_for_index`]
//! 2. The translator matches it against the registry snapshot
//! 3. Matching tasks are buffered in the queue
//! 4. The worker drains and collapses the queue on a timer or flush signal
//! 5. The batch processor pushes bulk upserts and deletes per index
//!
//! ## Example
//!
//! ```ignore
//! use sync_indexing::{IndexRegistry, IndexingService};
//!
//! let registry = Arc::new(IndexRegistry::with_indices(definitions)?);
//! let service = IndexingService::new(registry.clone());
//! service.enqueue_for_index(&notification)?;
//! service.flush_now();
//! ```

pub mod error;
pub mod matcher;
pub mod processor;
pub mod queue;
pub mod rebuild;
pub mod registry;
pub mod service;
pub mod store;
pub mod strategy;
pub mod translator;

pub use error::IndexingError;
pub use matcher::{content_type_allowed, is_match, language_matches, path_matches};
pub use processor::{BatchProcessor, ProcessResult};
pub use queue::{collapse_tasks, TaskQueue};
pub use rebuild::{
    rebuild_index, ContentSource, LoggingProgressCallback, NoOpProgressCallback,
    ProgressCallback, RebuildConfig, RebuildProgress, RebuildResult,
};
pub use registry::{validate_definitions, IndexRegistry, RegistrySnapshot};
pub use service::IndexingService;
pub use store::{parse_definitions, DefinitionFile, DefinitionStore};
pub use strategy::{
    DefaultStrategy, FieldExtractor, FieldExtractorStrategy, IndexingStrategy, StrategyRegistry,
    DEFAULT_STRATEGY,
};
pub use translator::TaskTranslator;
