//! Jitter for timer-driven drains.
//!
//! Every process instance flushes its own queue. A random delay on each
//! timer wait keeps many instances started together from hitting the search
//! service on the same tick.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Upper bound for the random delay added to each timer wait.
///
/// # Example
///
/// ```
/// use sync_scheduler::JitterConfig;
///
/// let config = JitterConfig::new(5);
/// let delay = config.generate_jitter();
/// assert!(delay < std::time::Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JitterConfig {
    /// Maximum jitter in seconds (0 = no jitter).
    pub max_jitter_secs: u64,
}

impl JitterConfig {
    pub fn new(max_jitter_secs: u64) -> Self {
        Self { max_jitter_secs }
    }

    /// No delay.
    pub fn none() -> Self {
        Self { max_jitter_secs: 0 }
    }

    /// A random duration in `[0, max_jitter_secs)`, or zero when disabled.
    pub fn generate_jitter(&self) -> Duration {
        if self.max_jitter_secs == 0 {
            return Duration::ZERO;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..self.max_jitter_secs * 1000);
        Duration::from_millis(jitter_ms)
    }

    pub fn is_enabled(&self) -> bool {
        self.max_jitter_secs > 0
    }

    /// `base` plus a fresh jitter sample.
    pub fn delay_after(&self, base: Duration) -> Duration {
        base + self.generate_jitter()
    }
}
