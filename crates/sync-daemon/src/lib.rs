//! Search sync daemon library exports.
//!
//! This crate provides the CLI binary for the search synchronization pipeline.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (run, check, stats, rebuild, list)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    check_notification, feed_notifications, format_index_table, init_logging, list_indexes,
    load_settings, match_report, open_client, rebuild, run_sync, selected_indexes, show_stats,
    FeedSummary, JsonLinesSource, Pipeline,
};
