//! End-to-end test infrastructure for search-sync.
//!
//! Provides a shared TestHarness and helper functions for E2E tests
//! covering the full change-notification-to-search-index pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use sync_indexing::{BatchProcessor, IndexRegistry, IndexingService, StrategyRegistry};
use sync_scheduler::{IndexingWorker, WorkerConfig};
use sync_search::{InMemorySearchClient, SearchClient, TantivySearchClient};
use sync_types::{ChangeNotification, ContentItem, IncludedPath, IndexDefinition};

/// Shared test harness for E2E tests.
///
/// Wires a registry, service and batch processor around an in-memory search
/// client that records every bulk call.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub registry: Arc<IndexRegistry>,
    pub service: Arc<IndexingService>,
    pub processor: Arc<BatchProcessor>,
    pub client: Arc<InMemorySearchClient>,
    /// Path for definition files
    pub definitions_path: PathBuf,
    /// Path for Tantivy index directories
    pub search_index_path: PathBuf,
}

impl TestHarness {
    /// Create a harness with the given index definitions.
    pub fn new(definitions: Vec<IndexDefinition>) -> Self {
        Self::with_strategies(definitions, StrategyRegistry::with_default())
    }

    /// Create a harness with custom strategies.
    pub fn with_strategies(definitions: Vec<IndexDefinition>, strategies: StrategyRegistry) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let definitions_path = temp_dir.path().join("indexes.toml");
        let search_index_path = temp_dir.path().join("search");

        let registry =
            Arc::new(IndexRegistry::with_indices(definitions).expect("Invalid definitions"));
        let client = Arc::new(InMemorySearchClient::new());
        let processor = Arc::new(BatchProcessor::new(
            registry.clone(),
            Arc::new(strategies),
            client.clone(),
        ));
        let service = Arc::new(IndexingService::new(registry.clone()));

        Self {
            _temp_dir: temp_dir,
            registry,
            service,
            processor,
            client,
            definitions_path,
            search_index_path,
        }
    }

    /// A worker over this harness's service and processor.
    pub fn worker(&self, config: WorkerConfig) -> IndexingWorker {
        IndexingWorker::new(self.service.clone(), self.processor.clone(), config)
            .expect("Invalid worker config")
    }

    /// A processor writing to real Tantivy indexes under the temp dir.
    pub fn tantivy_processor(&self) -> (Arc<BatchProcessor>, Arc<TantivySearchClient>) {
        let client = Arc::new(TantivySearchClient::new(&self.search_index_path, 15));
        let processor = Arc::new(BatchProcessor::new(
            self.registry.clone(),
            Arc::new(StrategyRegistry::with_default()),
            client.clone() as Arc<dyn SearchClient>,
        ));
        (processor, client)
    }

    /// Enqueue a notification, panicking on rejection.
    pub fn notify(&self, notification: ChangeNotification) -> usize {
        self.service
            .enqueue_for_index(&notification)
            .expect("Failed to enqueue notification")
    }
}

/// `Products` index: English, `/Products/%`, content type `Product`.
pub fn products_index() -> IndexDefinition {
    IndexDefinition::new(1, "Products")
        .with_language("en")
        .with_path(IncludedPath::new("/Products/%").with_content_types(["Product"]))
}

/// `Articles` index: English and Czech, `/Blog/%`, any content type, plus banners.
pub fn articles_index() -> IndexDefinition {
    IndexDefinition::new(2, "Articles")
        .with_language("en")
        .with_language("cz")
        .with_path(IncludedPath::new("/Blog/%"))
        .with_reusable_type("Banner")
}

/// A product page below `/Products`.
pub fn product(id: i64, name: &str, language: &str) -> ContentItem {
    ContentItem::page(id, "Product", language, format!("/Products/{name}"))
        .with_property("title", name)
}

/// An article page below `/Blog`.
pub fn article(id: i64, slug: &str, language: &str) -> ContentItem {
    ContentItem::page(id, "Article", language, format!("/Blog/{slug}"))
        .with_property("title", slug)
}
