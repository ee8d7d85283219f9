//! Background flush worker for the search synchronization pipeline.
//!
//! The worker owns the only consumer side of the indexing queue. It drains
//! on a fixed interval and whenever a producer requests a flush, collapses
//! duplicate tasks, and hands them to the batch processor.
//!
//! # Features
//!
//! - Timer and flush-signal drain triggers
//! - Jitter on the timer to spread multi-instance flushes
//! - Overlap guard: manual cycles never run alongside the loop's cycle
//! - Panic isolation: a failing cycle never ends the loop
//! - Graceful stop via `CancellationToken` with an optional final drain
//! - Status observability via [`WorkerStatus`]
//!
//! # Example
//!
//! ```ignore
//! use sync_scheduler::{IndexingWorker, WorkerConfig};
//!
//! let worker = IndexingWorker::new(service, processor, WorkerConfig::from_settings(&settings))?;
//! let handle = worker.spawn();
//!
//! // At the end of each request cycle
//! handle.flush_now();
//!
//! // On shutdown
//! handle.stop().await?;
//! ```

mod config;
mod error;
mod jitter;
mod overlap;
mod status;
mod worker;

pub use config::WorkerConfig;
pub use error::SchedulerError;
pub use jitter::JitterConfig;
pub use overlap::{OverlapGuard, RunGuard};
pub use status::{CycleResult, StatusTracker, Trigger, WorkerStatus};
pub use worker::{CycleReport, IndexingWorker, WorkerHandle};
