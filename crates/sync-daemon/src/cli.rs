//! CLI argument parsing for the search sync daemon.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Search Sync
///
/// Keeps full-text search indexes in step with content repository changes.
#[derive(Parser, Debug)]
#[command(name = "search-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/search-sync/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the index definitions file
    #[arg(short, long, global = true)]
    pub definitions: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read change notifications (JSON lines) and keep indexes in sync
    Run {
        /// Read notifications from this file instead of stdin
        #[arg(short, long)]
        input: Option<String>,

        /// Override the search index directory
        #[arg(long)]
        index_path: Option<String>,

        /// Seconds between timer-driven flushes
        #[arg(long)]
        flush_interval: Option<u64>,

        /// Start with indexing switched off
        #[arg(long)]
        disabled: bool,

        /// Use an in-memory search client (nothing is written to disk)
        #[arg(long)]
        dry_run: bool,
    },

    /// Show which indexes a change notification matches
    Check {
        /// Change notification as JSON
        notification: String,

        /// Only check this index
        #[arg(short, long)]
        index: Option<String>,
    },

    /// Show entry counts and last update times
    Stats {
        /// Only show this index
        #[arg(short, long)]
        index: Option<String>,

        /// Override the search index directory
        #[arg(long)]
        index_path: Option<String>,
    },

    /// Clear an index and repopulate it from a content dump
    Rebuild {
        /// Index to rebuild
        index: String,

        /// Content items, one JSON object per line
        #[arg(long)]
        items: String,

        /// Items per bulk upsert
        #[arg(long, default_value = "100")]
        batch_size: usize,

        /// Keep existing documents instead of clearing first
        #[arg(long)]
        no_clear: bool,

        /// Override the search index directory
        #[arg(long)]
        index_path: Option<String>,
    },

    /// List registered indexes
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "search-sync",
            "--definitions",
            "/tmp/indexes.toml",
            "run",
            "--dry-run",
            "--flush-interval",
            "2",
        ]);
        assert_eq!(cli.definitions.as_deref(), Some("/tmp/indexes.toml"));
        match cli.command {
            Commands::Run {
                dry_run,
                flush_interval,
                disabled,
                ..
            } => {
                assert!(dry_run);
                assert!(!disabled);
                assert_eq!(flush_interval, Some(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rebuild() {
        let cli = Cli::parse_from([
            "search-sync",
            "rebuild",
            "Products",
            "--items",
            "items.jsonl",
            "-l",
            "debug",
        ]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Rebuild {
                index,
                items,
                batch_size,
                no_clear,
                ..
            } => {
                assert_eq!(index, "Products");
                assert_eq!(items, "items.jsonl");
                assert_eq!(batch_size, 100);
                assert!(!no_clear);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::parse_from(["search-sync", "check", "{}", "--index", "Products"]);
        assert!(matches!(
            cli.command,
            Commands::Check { index: Some(ref i), .. } if i == "Products"
        ));
    }
}
