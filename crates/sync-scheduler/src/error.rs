//! Error types for the scheduler crate.

use thiserror::Error;

/// Errors that can occur while configuring or stopping the worker.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Worker configuration is unusable
    #[error("Invalid worker configuration: {0}")]
    InvalidConfig(String),

    /// The background task panicked or was aborted
    #[error("Worker task failed: {0}")]
    Join(String),

    /// Worker is not running
    #[error("Worker is not running")]
    NotRunning,
}

impl From<tokio::task::JoinError> for SchedulerError {
    fn from(err: tokio::task::JoinError) -> Self {
        SchedulerError::Join(err.to_string())
    }
}
