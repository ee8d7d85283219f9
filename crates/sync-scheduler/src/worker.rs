//! Background flush worker.
//!
//! A single long-lived task drains the indexing queue whenever the flush
//! interval elapses or a flush is requested, and hands the collapsed tasks to
//! the batch processor. A failing or panicking cycle is logged and recorded;
//! the loop keeps running until [`WorkerHandle::stop`] is called.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sync_indexing::{BatchProcessor, IndexingService, ProcessResult};

use crate::config::WorkerConfig;
use crate::overlap::OverlapGuard;
use crate::status::{CycleResult, StatusTracker, Trigger, WorkerStatus};
use crate::SchedulerError;

/// Outcome of one call to [`IndexingWorker::run_cycle`].
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub trigger: Trigger,
    pub result: CycleResult,
    /// Tasks left after collapsing the drained buffer.
    pub drained: usize,
    pub processed: ProcessResult,
    pub duration_ms: u64,
}

/// Drains the queue of an [`IndexingService`] into a [`BatchProcessor`].
pub struct IndexingWorker {
    service: Arc<IndexingService>,
    processor: Arc<BatchProcessor>,
    config: WorkerConfig,
    guard: OverlapGuard,
    status: StatusTracker,
}

impl IndexingWorker {
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if `config` does not validate.
    pub fn new(
        service: Arc<IndexingService>,
        processor: Arc<BatchProcessor>,
        config: WorkerConfig,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self {
            service,
            processor,
            config,
            guard: OverlapGuard::new(),
            status: StatusTracker::new(),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.status()
    }

    /// Drain the queue once and process what was drained.
    ///
    /// Returns immediately with [`CycleResult::Skipped`] if another cycle is
    /// in progress. A panic inside the processor is caught and reported as
    /// [`CycleResult::Failed`]; the tasks of that cycle are lost.
    pub async fn run_cycle(&self, trigger: Trigger, cancel: &CancellationToken) -> CycleReport {
        let Some(_run) = self.guard.try_acquire() else {
            debug!(%trigger, "Drain cycle already running, skipping");
            self.status.record_skipped(trigger);
            return CycleReport {
                trigger,
                result: CycleResult::Skipped("cycle already running".to_string()),
                drained: 0,
                processed: ProcessResult::default(),
                duration_ms: 0,
            };
        };

        self.status.record_start(trigger);
        let start = Instant::now();

        let tasks = self.service.queue().drain_collapsed();
        let drained = tasks.len();

        let outcome = AssertUnwindSafe(self.processor.process(tasks, cancel))
            .catch_unwind()
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(processed) => {
                if drained > 0 {
                    info!(
                        %trigger,
                        drained,
                        attempted = processed.attempted,
                        failed_batches = processed.failed_batches,
                        duration_ms,
                        "Drain cycle complete"
                    );
                }
                self.status
                    .record_complete(CycleResult::Success, duration_ms, Some(&processed));
                CycleReport {
                    trigger,
                    result: CycleResult::Success,
                    drained,
                    processed,
                    duration_ms,
                }
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(%trigger, drained, error = %message, "Drain cycle panicked");
                let result = CycleResult::Failed(message);
                self.status.record_complete(result.clone(), duration_ms, None);
                CycleReport {
                    trigger,
                    result,
                    drained,
                    processed: ProcessResult::default(),
                    duration_ms,
                }
            }
        }
    }

    /// Start the background loop on the current tokio runtime.
    pub fn spawn(self) -> WorkerHandle {
        let worker = Arc::new(self);
        let stop = CancellationToken::new();
        let abort = CancellationToken::new();
        let task = tokio::spawn(run_loop(worker.clone(), stop.clone(), abort.clone()));
        WorkerHandle {
            worker,
            stop,
            abort,
            task,
        }
    }
}

async fn run_loop(worker: Arc<IndexingWorker>, stop: CancellationToken, abort: CancellationToken) {
    let flush = worker.service.flush_signal();
    let interval = worker.config.flush_interval();
    info!(
        interval_secs = interval.as_secs(),
        max_jitter_secs = worker.config.jitter.max_jitter_secs,
        "Indexing worker started"
    );

    'run: loop {
        let delay = worker.config.jitter.delay_after(interval);
        let trigger = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = flush.notified() => Trigger::Flush,
            _ = tokio::time::sleep(delay) => Trigger::Timer,
        };
        // A manual cycle may hold the guard; retry once it is released
        while worker.run_cycle(trigger, &abort).await.result.is_skipped() {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break 'run,
                _ = worker.guard.released() => {}
            }
        }
    }

    if worker.config.drain_on_shutdown {
        while worker
            .run_cycle(Trigger::Shutdown, &abort)
            .await
            .result
            .is_skipped()
        {
            debug!("Final drain waiting for a manual cycle to finish");
            worker.guard.released().await;
        }
    } else {
        let queued = worker.service.queue().len();
        if queued > 0 {
            warn!(queued, "Stopping without draining queued tasks");
        }
    }

    info!("Indexing worker stopped");
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Control handle for a spawned [`IndexingWorker`].
pub struct WorkerHandle {
    worker: Arc<IndexingWorker>,
    stop: CancellationToken,
    abort: CancellationToken,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Request a drain at the next opportunity.
    pub fn flush_now(&self) {
        self.worker.service.flush_now();
    }

    /// Run a drain cycle on the caller's task.
    ///
    /// Skipped (and recorded as such) if the loop is mid-cycle.
    pub async fn process_now(&self) -> CycleReport {
        self.worker.run_cycle(Trigger::Manual, &self.abort).await
    }

    pub fn status(&self) -> WorkerStatus {
        self.worker.status()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the loop, run the final drain if configured, and join the task.
    ///
    /// The running cycle is allowed to finish. If the loop has not exited
    /// within the shutdown timeout, outstanding search calls are cancelled.
    /// Returns the worker status after the final drain.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Join` if the background task panicked.
    pub async fn stop(self) -> Result<WorkerStatus, SchedulerError> {
        info!("Stopping indexing worker");
        self.stop.cancel();

        let mut task = self.task;
        match tokio::time::timeout(self.worker.config.shutdown_timeout(), &mut task).await {
            Ok(joined) => joined?,
            Err(_) => {
                warn!(
                    timeout_secs = self.worker.config.shutdown_timeout_secs,
                    "Worker did not stop in time, cancelling in-flight calls"
                );
                self.abort.cancel();
                task.await?;
            }
        }
        Ok(self.worker.status())
    }
}
