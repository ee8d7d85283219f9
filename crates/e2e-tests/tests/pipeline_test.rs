//! End-to-end pipeline tests for search-sync.
//!
//! Verifies: change notification -> match -> enqueue -> drain -> collapse ->
//! bulk calls against the search client.

use pretty_assertions::assert_eq;
use std::time::Duration;

use e2e_tests::{article, articles_index, product, products_index, TestHarness};
use sync_indexing::{DefinitionStore, IndexRegistry};
use sync_scheduler::{CycleResult, Trigger, WorkerConfig};
use sync_search::ClientCall;
use sync_types::{ChangeNotification, ContentItem, IncludedPath, IndexDefinition};
use tokio_util::sync::CancellationToken;

// ===== Single change =====

/// A published product is upserted into Products after one flush.
#[tokio::test]
async fn test_published_page_reaches_index() {
    let harness = TestHarness::new(vec![products_index()]);

    let queued = harness.notify(ChangeNotification::published(product(42, "Chair", "en")));
    assert_eq!(queued, 1);
    assert_eq!(harness.service.queue().len(), 1);

    let worker = harness.worker(WorkerConfig::default());
    let report = worker
        .run_cycle(Trigger::Flush, &CancellationToken::new())
        .await;

    assert_eq!(report.result, CycleResult::Success);
    assert_eq!(report.drained, 1);
    assert_eq!(
        harness.client.calls(),
        vec![ClientCall::Upsert {
            index: "Products".to_string(),
            ids: vec!["42_en".to_string()],
        }]
    );
    assert!(harness.service.queue().is_empty());

    let document = harness.client.document("Products", "42_en").unwrap();
    assert_eq!(document.fields["title"], "Chair");
    assert_eq!(document.fields["item_id"], 42);
}

/// A language outside the index produces no tasks and no calls.
#[tokio::test]
async fn test_unmatched_language_is_ignored() {
    let harness = TestHarness::new(vec![products_index()]);

    let queued = harness.notify(ChangeNotification::published(product(42, "Chair", "cz")));
    assert_eq!(queued, 0);

    let worker = harness.worker(WorkerConfig::default());
    let report = worker
        .run_cycle(Trigger::Flush, &CancellationToken::new())
        .await;

    assert_eq!(report.drained, 0);
    assert!(harness.client.calls().is_empty());
}

/// A path outside every included path is ignored, including string-prefix siblings.
#[tokio::test]
async fn test_sibling_path_is_ignored() {
    let harness = TestHarness::new(vec![products_index()]);

    let sibling = ContentItem::page(7, "Product", "en", "/ProductsArchive/Old");
    assert_eq!(harness.notify(ChangeNotification::published(sibling)), 0);

    let root = ContentItem::page(8, "Product", "en", "/Products");
    assert_eq!(harness.notify(ChangeNotification::published(root)), 1);
}

/// Disabling indexing stops enqueueing without touching already queued tasks.
#[tokio::test]
async fn test_indexing_switch() {
    let harness = TestHarness::new(vec![products_index()]);
    harness.notify(ChangeNotification::published(product(1, "Desk", "en")));

    harness.service.set_indexing_enabled(false);
    assert_eq!(
        harness.notify(ChangeNotification::published(product(2, "Lamp", "en"))),
        0
    );
    assert_eq!(harness.service.queue().len(), 1);

    harness.service.set_indexing_enabled(true);
    assert_eq!(
        harness.notify(ChangeNotification::published(product(2, "Lamp", "en"))),
        1
    );
}

// ===== Collapsing =====

/// UPDATE, UPDATE, DELETE on one item yields a single delete.
#[tokio::test]
async fn test_trailing_delete_wins() {
    let harness = TestHarness::new(vec![products_index()]);
    let item = product(5, "Sofa", "en");

    harness.notify(ChangeNotification::updated(item.clone()));
    harness.notify(ChangeNotification::updated(item.clone()));
    harness.notify(ChangeNotification::deleted(item));
    assert_eq!(harness.service.queue().len(), 3);

    let worker = harness.worker(WorkerConfig::default());
    let report = worker
        .run_cycle(Trigger::Flush, &CancellationToken::new())
        .await;

    assert_eq!(report.drained, 1);
    assert_eq!(
        harness.client.calls(),
        vec![ClientCall::Delete {
            index: "Products".to_string(),
            ids: vec!["5_en".to_string()],
        }]
    );
}

/// UPDATE, DELETE, UPDATE on one item yields a single upsert of the last snapshot.
#[tokio::test]
async fn test_latest_update_wins() {
    let harness = TestHarness::new(vec![products_index()]);

    harness.notify(ChangeNotification::updated(product(5, "Sofa", "en")));
    harness.notify(ChangeNotification::deleted(product(5, "Sofa", "en")));
    harness.notify(ChangeNotification::updated(
        product(5, "Sofa", "en").with_property("title", "Corner Sofa"),
    ));

    let worker = harness.worker(WorkerConfig::default());
    worker
        .run_cycle(Trigger::Flush, &CancellationToken::new())
        .await;

    assert_eq!(harness.client.upsert_calls().len(), 1);
    assert!(harness.client.delete_calls().is_empty());
    let document = harness.client.document("Products", "5_en").unwrap();
    assert_eq!(document.fields["title"], "Corner Sofa");
}

/// Language variants of one page are separate documents.
#[tokio::test]
async fn test_language_variants_are_distinct() {
    let harness = TestHarness::new(vec![articles_index()]);

    harness.notify(ChangeNotification::published(article(9, "launch", "en")));
    harness.notify(ChangeNotification::published(article(9, "launch", "cz")));

    let worker = harness.worker(WorkerConfig::default());
    let report = worker
        .run_cycle(Trigger::Flush, &CancellationToken::new())
        .await;

    assert_eq!(report.drained, 2);
    assert_eq!(harness.client.document_count("Articles"), 2);
}

// ===== Fan-out =====

/// One change matching two indexes yields one task per index.
#[tokio::test]
async fn test_fan_out_to_matching_indexes() {
    let everything = IndexDefinition::new(3, "Everything")
        .with_language("en")
        .with_path(IncludedPath::new("/%"));
    let harness = TestHarness::new(vec![products_index(), articles_index(), everything]);

    let queued = harness.notify(ChangeNotification::published(product(11, "Stool", "en")));
    assert_eq!(queued, 2);

    let worker = harness.worker(WorkerConfig::default());
    let report = worker
        .run_cycle(Trigger::Flush, &CancellationToken::new())
        .await;

    assert_eq!(report.processed.succeeded_batches, 2);
    assert_eq!(harness.client.document_count("Products"), 1);
    assert_eq!(harness.client.document_count("Everything"), 1);
    assert_eq!(harness.client.document_count("Articles"), 0);
}

/// Reusable items match through the index's reusable content types.
#[tokio::test]
async fn test_reusable_item_indexed() {
    let harness = TestHarness::new(vec![products_index(), articles_index()]);

    let banner = ContentItem::reusable(30, "Banner", "en").with_property("text", "Sale");
    assert_eq!(harness.notify(ChangeNotification::published(banner)), 1);

    let worker = harness.worker(WorkerConfig::default());
    worker
        .run_cycle(Trigger::Flush, &CancellationToken::new())
        .await;

    assert!(harness.client.document("Articles", "30_banner").is_some());
}

/// Deletes and upserts for one index go out as one call each, deletes first.
#[tokio::test]
async fn test_one_call_per_operation() {
    let harness = TestHarness::new(vec![products_index()]);

    for id in 1..=3 {
        harness.notify(ChangeNotification::published(product(id, "Item", "en")));
    }
    harness.notify(ChangeNotification::deleted(product(4, "Gone", "en")));

    let worker = harness.worker(WorkerConfig::default());
    worker
        .run_cycle(Trigger::Flush, &CancellationToken::new())
        .await;

    let calls = harness.client.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0], ClientCall::Delete { ids, .. } if ids.len() == 1));
    assert!(matches!(&calls[1], ClientCall::Upsert { ids, .. } if ids.len() == 3));
}

// ===== Registry changes =====

/// Replacing the definitions makes old names unresolvable.
#[tokio::test]
async fn test_set_indices_replaces_registry() {
    let harness = TestHarness::new(vec![products_index()]);
    assert!(harness.registry.contains("products"));

    harness
        .registry
        .set_indices(vec![articles_index()])
        .unwrap();

    assert!(!harness.registry.contains("Products"));
    assert!(harness.registry.get_index("Products").unwrap().is_none());
    assert_eq!(
        harness.notify(ChangeNotification::published(product(1, "Desk", "en"))),
        0
    );
}

/// Definitions saved to disk load back into an equivalent registry.
#[tokio::test]
async fn test_definitions_survive_restart() {
    let harness = TestHarness::new(vec![products_index(), articles_index()]);
    let store = DefinitionStore::new(harness.definitions_path.clone());
    store.save_registry(&harness.registry).unwrap();

    let restored = IndexRegistry::new();
    assert_eq!(store.load_into(&restored).unwrap(), 2);
    assert_eq!(
        restored.get_index("articles").unwrap().as_deref(),
        Some(&articles_index())
    );
}

/// Tasks queued for an index removed before the drain are dropped.
#[tokio::test]
async fn test_removed_index_tasks_are_skipped() {
    let harness = TestHarness::new(vec![products_index(), articles_index()]);
    harness.notify(ChangeNotification::published(product(1, "Desk", "en")));

    assert!(harness.registry.remove_index(1));

    let worker = harness.worker(WorkerConfig::default());
    let report = worker
        .run_cycle(Trigger::Flush, &CancellationToken::new())
        .await;

    assert_eq!(report.processed.skipped, 1);
    assert!(harness.client.calls().is_empty());
}

/// Items the strategy declines are not sent.
#[tokio::test]
async fn test_unpublished_snapshot_is_skipped() {
    let harness = TestHarness::new(vec![products_index()]);
    harness.notify(ChangeNotification::updated(
        product(3, "Draft", "en").with_property("published", false),
    ));

    let tasks = harness.service.queue().drain_collapsed();
    let result = harness
        .processor
        .process(tasks, &CancellationToken::new())
        .await;

    assert_eq!(result.skipped, 1);
    assert_eq!(result.attempted, 0);
    assert!(harness.client.calls().is_empty());
}

// ===== Background worker =====

/// A flush request wakes the spawned worker well before the timer.
#[tokio::test]
async fn test_flush_wakes_worker() {
    let harness = TestHarness::new(vec![products_index()]);
    let handle = harness
        .worker(WorkerConfig::default().with_flush_interval(3600))
        .spawn();

    harness.notify(ChangeNotification::published(product(42, "Chair", "en")));
    harness.service.flush_now();

    tokio::time::timeout(Duration::from_secs(5), async {
        while harness.client.upsert_calls().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("worker did not drain after flush");

    let status = handle.stop().await.unwrap();
    assert!(status.run_count >= 1);
    assert_eq!(harness.client.upsert_calls().len(), 1);
}

/// Stopping the worker drains whatever is still queued.
#[tokio::test]
async fn test_stop_drains_queue() {
    let harness = TestHarness::new(vec![products_index()]);
    let handle = harness
        .worker(WorkerConfig::default().with_flush_interval(3600))
        .spawn();

    harness.notify(ChangeNotification::published(product(1, "Desk", "en")));
    harness.notify(ChangeNotification::published(product(2, "Lamp", "en")));

    let status = handle.stop().await.unwrap();

    assert_eq!(status.last_trigger, Some(Trigger::Shutdown));
    assert_eq!(harness.client.document_count("Products"), 2);
    assert!(harness.service.queue().is_empty());
}
