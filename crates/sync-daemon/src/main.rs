//! Search Sync
//!
//! Keeps external full-text search indexes in sync with a content repository.
//!
//! # Usage
//!
//! ```bash
//! search-sync run [--input FILE] [--dry-run] < notifications.jsonl
//! search-sync check '{"item_id":1,...,"event":"published"}'
//! search-sync stats [--index NAME]
//! search-sync rebuild NAME --items items.jsonl
//! search-sync list
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/search-sync/config.toml)
//! 3. Environment variables (SEARCHSYNC_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use sync_daemon::{
    check_notification, init_logging, list_indexes, load_settings, rebuild, run_sync, show_stats,
    Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(
        cli.config.as_deref(),
        cli.log_level.as_deref(),
        cli.definitions.as_deref(),
    )?;
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Run {
            input,
            index_path,
            flush_interval,
            disabled,
            dry_run,
        } => {
            if let Some(path) = index_path {
                settings.search_index_path = path;
            }
            if let Some(secs) = flush_interval {
                settings.flush_interval_secs = secs;
            }
            run_sync(&settings, input.as_deref(), dry_run, disabled).await?;
        }
        Commands::Check {
            notification,
            index,
        } => {
            check_notification(&settings, &notification, index.as_deref())?;
        }
        Commands::Stats { index, index_path } => {
            if let Some(path) = index_path {
                settings.search_index_path = path;
            }
            show_stats(&settings, index.as_deref()).await?;
        }
        Commands::Rebuild {
            index,
            items,
            batch_size,
            no_clear,
            index_path,
        } => {
            if let Some(path) = index_path {
                settings.search_index_path = path;
            }
            rebuild(&settings, &index, &items, batch_size, !no_clear).await?;
        }
        Commands::List => {
            list_indexes(&settings)?;
        }
    }

    Ok(())
}
