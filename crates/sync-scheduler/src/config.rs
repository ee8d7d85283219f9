//! Worker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use sync_types::Settings;

use crate::jitter::JitterConfig;
use crate::SchedulerError;

/// Configuration for the background flush worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Seconds between timer-driven drains.
    /// Defaults to 10 seconds.
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,

    /// Random delay added to each timer wait.
    #[serde(default)]
    pub jitter: JitterConfig,

    /// Run one last drain when the worker is stopped.
    #[serde(default = "default_drain_on_shutdown")]
    pub drain_on_shutdown: bool,

    /// Timeout in seconds for graceful shutdown.
    /// The running cycle and the final drain are cancelled after this.
    /// Defaults to 30 seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_flush_interval() -> u64 {
    10
}

fn default_drain_on_shutdown() -> bool {
    true
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval(),
            jitter: JitterConfig::none(),
            drain_on_shutdown: default_drain_on_shutdown(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl WorkerConfig {
    /// Worker settings taken from the application settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            flush_interval_secs: settings.flush_interval_secs,
            jitter: JitterConfig::new(settings.jitter_secs),
            drain_on_shutdown: settings.drain_on_shutdown,
            ..Default::default()
        }
    }

    pub fn with_flush_interval(mut self, secs: u64) -> Self {
        self.flush_interval_secs = secs;
        self
    }

    pub fn with_drain_on_shutdown(mut self, drain: bool) -> Self {
        self.drain_on_shutdown = drain;
        self
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` for a zero flush interval.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.flush_interval_secs == 0 {
            return Err(SchedulerError::InvalidConfig(
                "flush_interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
