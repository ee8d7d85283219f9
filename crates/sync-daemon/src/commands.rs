//! Command implementations for the search sync daemon.
//!
//! Handles:
//! - run: feed change notifications through the pipeline until EOF or Ctrl+C
//! - check: match diagnostics for one notification
//! - stats: entry counts per index
//! - rebuild: clear and repopulate one index from a content dump
//! - list: registered index definitions

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sync_indexing::{
    is_match, rebuild_index, BatchProcessor, ContentSource, DefinitionStore, IndexRegistry,
    IndexingError, IndexingService, LoggingProgressCallback, RebuildConfig, StrategyRegistry,
};
use sync_scheduler::{IndexingWorker, WorkerConfig};
use sync_search::{InMemorySearchClient, SearchClient, TantivySearchClient};
use sync_types::{ChangeNotification, ContentItem, IndexDefinition, Settings};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    definitions_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    if let Some(definitions) = definitions_override {
        settings.definitions_path = definitions.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so command
/// output on stdout stays machine-readable.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// The wired-up pipeline shared by every command.
pub struct Pipeline {
    pub registry: Arc<IndexRegistry>,
    pub service: Arc<IndexingService>,
    pub processor: Arc<BatchProcessor>,
    pub client: Arc<dyn SearchClient>,
}

impl Pipeline {
    /// Load definitions and connect them to `client`.
    pub fn build(settings: &Settings, client: Arc<dyn SearchClient>) -> Result<Self> {
        let store = DefinitionStore::new(settings.expanded_definitions_path());
        let registry = Arc::new(IndexRegistry::new());
        let count = store.load_into(&registry).with_context(|| {
            format!(
                "Failed to load index definitions from {}",
                store.path().display()
            )
        })?;
        info!(count, client = client.name(), "Pipeline ready");

        let service = Arc::new(
            IndexingService::new(registry.clone()).with_indexing_enabled(settings.indexing_enabled),
        );
        let processor = Arc::new(BatchProcessor::new(
            registry.clone(),
            Arc::new(StrategyRegistry::with_default()),
            client.clone(),
        ));

        Ok(Self {
            registry,
            service,
            processor,
            client,
        })
    }
}

/// Search client for the configured index directory, or an in-memory one.
pub fn open_client(settings: &Settings, dry_run: bool) -> Arc<dyn SearchClient> {
    if dry_run {
        info!("Dry run, using in-memory search client");
        return Arc::new(InMemorySearchClient::new());
    }
    let path = settings.expanded_search_index_path();
    info!("Search indexes at {:?}", path);
    Arc::new(TantivySearchClient::new(path, settings.writer_memory_mb))
}

/// Counts from feeding a notification stream.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedSummary {
    /// Non-empty lines read.
    pub notifications: usize,
    /// Tasks enqueued over all notifications.
    pub tasks: usize,
    /// Lines that could not be parsed or enqueued.
    pub rejected: usize,
}

/// Enqueue one notification per JSON line, flushing after each.
///
/// Each line is one request cycle: translate, enqueue, then signal a flush.
/// Bad lines are logged and counted, never fatal.
pub async fn feed_notifications<R>(
    service: &IndexingService,
    reader: R,
    cancel: &CancellationToken,
) -> Result<FeedSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = FeedSummary::default();
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read notification")?,
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        summary.notifications += 1;

        let enqueued = ChangeNotification::from_json(line)
            .map_err(IndexingError::from)
            .and_then(|notification| service.enqueue_for_index(&notification));
        match enqueued {
            Ok(count) => summary.tasks += count,
            Err(e) => {
                warn!(line = summary.notifications, error = %e, "Rejected notification");
                summary.rejected += 1;
            }
        }
        service.flush_now();
    }

    debug!(?summary, "Notification stream ended");
    Ok(summary)
}

/// Run the pipeline over a notification stream until EOF or Ctrl+C.
pub async fn run_sync(
    settings: &Settings,
    input: Option<&str>,
    dry_run: bool,
    disabled: bool,
) -> Result<()> {
    let pipeline = Pipeline::build(settings, open_client(settings, dry_run))?;
    if disabled {
        pipeline.service.set_indexing_enabled(false);
    }

    let worker = IndexingWorker::new(
        pipeline.service.clone(),
        pipeline.processor.clone(),
        WorkerConfig::from_settings(settings),
    )
    .context("Invalid worker configuration")?;
    let handle = worker.spawn();

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, shutting down...");
                    cancel.cancel();
                }
                Err(e) => warn!(error = %e, "Failed to install Ctrl+C handler"),
            }
        })
    };

    let summary = match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {path}"))?;
            feed_notifications(&pipeline.service, BufReader::new(file), &cancel).await
        }
        None => {
            feed_notifications(&pipeline.service, BufReader::new(tokio::io::stdin()), &cancel)
                .await
        }
    };
    ctrl_c.abort();

    let status = handle.stop().await.context("Worker did not stop cleanly")?;
    let summary = summary?;

    info!(
        notifications = summary.notifications,
        tasks = summary.tasks,
        rejected = summary.rejected,
        "Input finished"
    );
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// The registered index named `index`, or every index when `None`.
pub fn selected_indexes(
    registry: &IndexRegistry,
    index: Option<&str>,
) -> Result<Vec<Arc<IndexDefinition>>, IndexingError> {
    match index {
        Some(name) => Ok(vec![registry
            .get_index(name)?
            .ok_or_else(|| IndexingError::UnknownIndex(name.to_string()))?]),
        None => Ok(registry.get_all_indices()),
    }
}

/// Per-index match results for one notification.
pub fn match_report(
    registry: &IndexRegistry,
    notification: &ChangeNotification,
    index: Option<&str>,
) -> Result<Vec<(String, bool)>, IndexingError> {
    selected_indexes(registry, index)?
        .iter()
        .map(|def| Ok((def.name.clone(), is_match(&notification.item, def)?)))
        .collect()
}

/// Print which indexes a notification matches.
pub fn check_notification(settings: &Settings, json: &str, index: Option<&str>) -> Result<()> {
    let notification = ChangeNotification::from_json(json).context("Invalid notification")?;
    let pipeline = Pipeline::build(settings, Arc::new(InMemorySearchClient::new()))?;

    let report = match_report(&pipeline.registry, &notification, index)?;
    if report.is_empty() {
        println!("No indexes registered");
    }
    for (name, matched) in report {
        println!("{:<30} {}", name, if matched { "match" } else { "-" });
    }
    Ok(())
}

/// Print entry counts and last update time per index.
pub async fn show_stats(settings: &Settings, index: Option<&str>) -> Result<()> {
    let pipeline = Pipeline::build(settings, open_client(settings, false))?;
    // Unknown names must not reach the client, which would create an empty index
    let definitions = selected_indexes(&pipeline.registry, index)?;

    println!("{:<30} {:>10}  LAST UPDATED", "INDEX", "ENTRIES");
    for definition in definitions {
        let name = &definition.name;
        let stats = pipeline
            .client
            .get_statistics(name)
            .await
            .with_context(|| format!("Failed to read statistics for {name}"))?;
        let updated = stats
            .last_updated_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!("{:<30} {:>10}  {}", name, stats.entry_count, updated);
    }
    Ok(())
}

/// Reads content items from a JSON-lines file.
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ContentSource for JsonLinesSource {
    async fn load_items(&self) -> Result<Vec<ContentItem>, IndexingError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| IndexingError::Source(format!("{}: {e}", self.path.display())))?;

        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .map_err(|e| IndexingError::Source(format!("line {}: {e}", n + 1)))
            })
            .collect()
    }
}

/// Clear one index and repopulate it from a content dump.
pub async fn rebuild(
    settings: &Settings,
    index: &str,
    items_path: &str,
    batch_size: usize,
    clear_first: bool,
) -> Result<()> {
    let pipeline = Pipeline::build(settings, open_client(settings, false))?;
    let source = JsonLinesSource::new(items_path);
    let config = RebuildConfig::default()
        .with_batch_size(batch_size)
        .with_clear_first(clear_first);

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("Received Ctrl+C, cancelling rebuild...");
                cancel.cancel();
            }
        })
    };

    let result = rebuild_index(
        &pipeline.processor,
        index,
        &source,
        &config,
        &LoggingProgressCallback,
        &cancel,
    )
    .await;
    watcher.abort();

    let result = result.with_context(|| format!("Rebuild of {index} failed"))?;
    println!(
        "Rebuilt {}: {} scanned, {} matched, {} upserted, {} failed batches ({} ms)",
        result.index_name,
        result.progress.scanned,
        result.progress.matched,
        result.progress.processed.documents_upserted,
        result.progress.processed.failed_batches,
        result.elapsed_ms
    );
    Ok(())
}

/// One line per definition.
pub fn format_index_table(definitions: &[Arc<IndexDefinition>]) -> String {
    let mut out = format!(
        "{:<4} {:<24} {:<12} {:<12} {}\n",
        "ID", "NAME", "STRATEGY", "LANGUAGES", "PATHS"
    );
    for def in definitions {
        let paths: Vec<&str> = def
            .included_paths
            .iter()
            .map(|p| p.alias_path.as_str())
            .collect();
        out.push_str(&format!(
            "{:<4} {:<24} {:<12} {:<12} {}\n",
            def.id,
            def.name,
            def.strategy_name,
            def.language_names.join(","),
            paths.join(" ")
        ));
    }
    out
}

/// Print registered index definitions.
pub fn list_indexes(settings: &Settings) -> Result<()> {
    let pipeline = Pipeline::build(settings, Arc::new(InMemorySearchClient::new()))?;
    let definitions = pipeline.registry.get_all_indices();
    if definitions.is_empty() {
        println!(
            "No indexes defined in {}",
            settings.expanded_definitions_path().display()
        );
        return Ok(());
    }
    print!("{}", format_index_table(&definitions));
    Ok(())
}
