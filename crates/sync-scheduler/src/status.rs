//! Worker status tracking.
//!
//! Records when drain cycles ran, what triggered them, how long they took and
//! what the batch processor reported, so the daemon can expose it.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sync_indexing::ProcessResult;

/// What started a drain cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The flush interval elapsed
    Timer,
    /// A producer requested a flush at the end of a request cycle
    Flush,
    /// `process_now` was called
    Manual,
    /// Final drain while stopping
    Shutdown,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::Timer => "timer",
            Trigger::Flush => "flush",
            Trigger::Manual => "manual",
            Trigger::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Result of one drain cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CycleResult {
    /// Cycle completed; individual batches may still have failed
    Success,
    /// Cycle aborted with an error message
    Failed(String),
    /// Cycle not started because another one was running
    Skipped(String),
}

impl CycleResult {
    pub fn is_skipped(&self) -> bool {
        matches!(self, CycleResult::Skipped(_))
    }
}

/// Snapshot of the worker's history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerStatus {
    /// When the last cycle started
    pub last_run: Option<DateTime<Utc>>,
    /// Duration of the last cycle in milliseconds
    pub last_duration_ms: Option<u64>,
    /// What triggered the last cycle
    pub last_trigger: Option<Trigger>,
    /// Result of the last cycle
    pub last_result: Option<CycleResult>,
    /// Batch processor counts from the last completed cycle
    pub last_processed: Option<ProcessResult>,
    /// Cycles that ran (successfully or not)
    pub run_count: u64,
    /// Cycles that failed
    pub error_count: u64,
    /// Triggers skipped because a cycle was running
    pub skipped_count: u64,
    /// Tasks that were part of an attempted bulk call, over all cycles
    pub tasks_attempted: u64,
    /// Bulk calls that failed, over all cycles
    pub failed_batches: u64,
    /// Whether a cycle is executing right now
    pub is_running: bool,
}

/// Thread-safe holder of [`WorkerStatus`].
#[derive(Debug, Default)]
pub struct StatusTracker {
    status: RwLock<WorkerStatus>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a cycle has started.
    pub fn record_start(&self, trigger: Trigger) {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        status.is_running = true;
        status.last_run = Some(Utc::now());
        status.last_trigger = Some(trigger);
    }

    /// Record that a cycle has finished.
    pub fn record_complete(
        &self,
        result: CycleResult,
        duration_ms: u64,
        processed: Option<&ProcessResult>,
    ) {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        status.is_running = false;
        status.last_duration_ms = Some(duration_ms);
        status.run_count += 1;
        if matches!(result, CycleResult::Failed(_)) {
            status.error_count += 1;
        }
        if let Some(processed) = processed {
            status.tasks_attempted += processed.attempted as u64;
            status.failed_batches += processed.failed_batches as u64;
        }
        status.last_processed = processed.cloned();
        status.last_result = Some(result);
    }

    /// Record a trigger that found a cycle already running.
    pub fn record_skipped(&self, trigger: Trigger) {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        status.skipped_count += 1;
        status.last_result = Some(CycleResult::Skipped(format!(
            "{trigger} trigger while a cycle was running"
        )));
    }

    pub fn status(&self) -> WorkerStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_running
    }
}
