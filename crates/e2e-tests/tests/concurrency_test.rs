//! E2E concurrency tests for search-sync.
//!
//! Verifies: concurrent producers never lose tasks while the worker drains,
//! and registry replacement is safe under concurrent reads.

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use e2e_tests::{articles_index, product, products_index, TestHarness};
use sync_scheduler::WorkerConfig;
use sync_indexing::IndexingError;
use sync_search::ClientCall;
use sync_types::{ChangeNotification, IncludedPath, IndexDefinition};

// ===== Producers and worker =====

/// Every item published by concurrent producers ends up indexed exactly once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_with_running_worker() {
    let harness = TestHarness::new(vec![products_index()]);
    let handle = harness
        .worker(WorkerConfig::default().with_flush_interval(1))
        .spawn();

    let producers = 8;
    let per_producer = 50;
    let mut tasks = Vec::new();
    for p in 0..producers {
        let service = harness.service.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..per_producer {
                let id = (p * per_producer + i) as i64;
                service
                    .enqueue_for_index(&ChangeNotification::published(product(
                        id, "Item", "en",
                    )))
                    .unwrap();
                if i % 10 == 0 {
                    service.flush_now();
                    tokio::task::yield_now().await;
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let status = handle.stop().await.unwrap();
    assert!(status.run_count >= 1);
    assert!(harness.service.queue().is_empty());

    let mut ids = BTreeSet::new();
    let mut total = 0;
    for call in harness.client.upsert_calls() {
        if let ClientCall::Upsert { ids: batch, .. } = call {
            total += batch.len();
            ids.extend(batch);
        }
    }
    assert_eq!(ids.len(), producers * per_producer);
    assert_eq!(total, producers * per_producer);
    assert_eq!(
        harness.client.document_count("Products"),
        producers * per_producer
    );
}

/// Repeated changes to the same items collapse across producers.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_collapse() {
    let harness = TestHarness::new(vec![products_index()]);

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let service = harness.service.clone();
        tasks.push(tokio::spawn(async move {
            for id in 0..10 {
                service
                    .enqueue_for_index(&ChangeNotification::updated(product(id, "Item", "en")))
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(harness.service.queue().len(), 40);

    let drained = harness.service.queue().drain_collapsed();
    assert_eq!(drained.len(), 10);
}

/// Many flush requests before the worker wakes coalesce into few cycles.
#[tokio::test]
async fn test_flush_requests_coalesce() {
    let harness = TestHarness::new(vec![products_index()]);
    for id in 0..5 {
        harness.notify(ChangeNotification::published(product(id, "Item", "en")));
        harness.service.flush_now();
    }

    let handle = harness
        .worker(WorkerConfig::default().with_flush_interval(3600))
        .spawn();

    tokio::time::timeout(Duration::from_secs(5), async {
        while harness.client.upsert_calls().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("worker did not drain");

    let status = handle.stop().await.unwrap();
    assert_eq!(harness.client.upsert_calls().len(), 1);
    // One flush cycle plus the shutdown drain
    assert_eq!(status.run_count, 2);
}

// ===== Registry =====

/// Readers always see a complete definition set while writers replace it.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registry_swap_during_reads() {
    let harness = TestHarness::new(vec![products_index(), articles_index()]);
    let registry = harness.registry.clone();

    let writer = {
        let registry = registry.clone();
        tokio::spawn(async move {
            for round in 0..200 {
                let definitions = if round % 2 == 0 {
                    vec![
                        IndexDefinition::new(10, "Catalogue")
                            .with_language("en")
                            .with_path(IncludedPath::new("/Products/%")),
                        IndexDefinition::new(11, "Help")
                            .with_language("en")
                            .with_path(IncludedPath::new("/Help/%")),
                    ]
                } else {
                    vec![products_index(), articles_index()]
                };
                registry.set_indices(definitions).unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let registry = Arc::clone(&registry);
        let service = harness.service.clone();
        readers.push(tokio::spawn(async move {
            let mut total = 0;
            for id in 0..200 {
                let snapshot = registry.snapshot();
                let names: BTreeSet<String> =
                    snapshot.iter().map(|d| d.name.clone()).collect();
                assert_eq!(names.len(), 2);
                assert!(
                    names.contains("Products") == names.contains("Articles"),
                    "mixed snapshot: {names:?}"
                );

                // A product matches exactly one index in either generation.
                // The generation may change between translation and enqueue.
                match service.enqueue_for_index(&ChangeNotification::published(product(
                    id, "Item", "en",
                ))) {
                    Ok(queued) => {
                        assert_eq!(queued, 1);
                        total += queued;
                    }
                    Err(IndexingError::UnknownIndex(_)) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
                tokio::task::yield_now().await;
            }
            total
        }));
    }

    writer.await.unwrap();
    let mut accepted = 0;
    for reader in readers {
        accepted += reader.await.unwrap();
    }
    assert_eq!(harness.service.queue().len(), accepted);
}
