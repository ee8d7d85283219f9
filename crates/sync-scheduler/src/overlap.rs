//! Overlap guard for drain cycles.
//!
//! Only one drain-and-process cycle may run at a time so the deduplication of
//! one batch is never interleaved with another. Timer, flush and manual
//! triggers all go through the same guard; a trigger that finds a cycle in
//! progress is skipped rather than queued. Callers that must not lose their
//! trigger wait on [`OverlapGuard::released`] and try again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Lock-free "is a cycle running" flag.
#[derive(Debug, Default)]
pub struct OverlapGuard {
    is_running: Arc<AtomicBool>,
    on_release: Arc<Notify>,
}

impl OverlapGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, or `None` if a cycle is already running.
    pub fn try_acquire(&self) -> Option<RunGuard> {
        self.is_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunGuard {
                flag: self.is_running.clone(),
                on_release: self.on_release.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Resolve once no cycle is running. Returns immediately if idle.
    pub async fn released(&self) {
        let notified = self.on_release.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a release in between is not missed
        notified.as_mut().enable();
        if !self.is_running() {
            return;
        }
        notified.await;
    }
}

/// Releases the running flag when dropped, including during a panic unwind.
#[derive(Debug)]
pub struct RunGuard {
    flag: Arc<AtomicBool>,
    on_release: Arc<Notify>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        self.on_release.notify_waiters();
    }
}
