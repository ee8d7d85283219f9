//! Configuration loading for search-sync.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/search-sync/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SyncError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Global indexing switch. When false, change notifications produce no tasks.
    #[serde(default = "default_indexing_enabled")]
    pub indexing_enabled: bool,

    /// Seconds between timer-driven queue drains.
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,

    /// Maximum random delay before the first timer tick.
    #[serde(default)]
    pub jitter_secs: u64,

    /// Whether stopping the worker performs one final drain.
    #[serde(default = "default_drain_on_shutdown")]
    pub drain_on_shutdown: bool,

    /// TOML file holding the index definitions.
    #[serde(default = "default_definitions_path")]
    pub definitions_path: String,

    /// Directory of the Tantivy-backed search indexes.
    #[serde(default = "default_search_index_path")]
    pub search_index_path: String,

    /// Memory budget per index writer in MB.
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_indexing_enabled() -> bool {
    true
}

fn default_flush_interval() -> u64 {
    10
}

fn default_drain_on_shutdown() -> bool {
    true
}

fn default_definitions_path() -> String {
    ProjectDirs::from("", "", "search-sync")
        .map(|p| p.config_dir().join("indices.toml"))
        .unwrap_or_else(|| PathBuf::from("./indices.toml"))
        .to_string_lossy()
        .to_string()
}

fn default_search_index_path() -> String {
    ProjectDirs::from("", "", "search-sync")
        .map(|p| p.data_local_dir().join("indexes"))
        .unwrap_or_else(|| PathBuf::from("./indexes"))
        .to_string_lossy()
        .to_string()
}

fn default_writer_memory_mb() -> usize {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indexing_enabled: default_indexing_enabled(),
            flush_interval_secs: default_flush_interval(),
            jitter_secs: 0,
            drain_on_shutdown: default_drain_on_shutdown(),
            definitions_path: default_definitions_path(),
            search_index_path: default_search_index_path(),
            writer_memory_mb: default_writer_memory_mb(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/search-sync/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (SEARCHSYNC_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, SyncError> {
        let config_dir = ProjectDirs::from("", "", "search-sync")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("indexing_enabled", default_indexing_enabled())
            .map_err(|e| SyncError::Config(e.to_string()))?
            .set_default("flush_interval_secs", default_flush_interval() as i64)
            .map_err(|e| SyncError::Config(e.to_string()))?
            .set_default("jitter_secs", 0_i64)
            .map_err(|e| SyncError::Config(e.to_string()))?
            .set_default("drain_on_shutdown", default_drain_on_shutdown())
            .map_err(|e| SyncError::Config(e.to_string()))?
            .set_default("definitions_path", default_definitions_path())
            .map_err(|e| SyncError::Config(e.to_string()))?
            .set_default("search_index_path", default_search_index_path())
            .map_err(|e| SyncError::Config(e.to_string()))?
            .set_default("writer_memory_mb", default_writer_memory_mb() as i64)
            .map_err(|e| SyncError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| SyncError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SEARCHSYNC_FLUSH_INTERVAL_SECS, SEARCHSYNC_INDEXING_ENABLED, ...
        builder = builder.add_source(
            Environment::with_prefix("SEARCHSYNC")
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.flush_interval_secs == 0 {
            return Err(SyncError::Config(
                "flush_interval_secs must be > 0".to_string(),
            ));
        }
        if self.writer_memory_mb == 0 {
            return Err(SyncError::Config("writer_memory_mb must be > 0".to_string()));
        }
        Ok(())
    }

    /// Expand a leading `~/` in the search index path.
    pub fn expanded_search_index_path(&self) -> PathBuf {
        expand_home(&self.search_index_path)
    }

    /// Expand a leading `~/` in the definitions path.
    pub fn expanded_definitions_path(&self) -> PathBuf {
        expand_home(&self.definitions_path)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
