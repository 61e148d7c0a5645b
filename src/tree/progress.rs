//! Throttled progress reporting for long tree walks

use std::time::{Duration, Instant};

/// Default interval between progress events
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Emits at most one progress event per interval. Purely advisory.
pub struct ProgressThrottle {
    label: &'static str,
    interval: Duration,
    last: Instant,
    count: u64,
}

impl ProgressThrottle {
    pub fn new(label: &'static str) -> Self {
        Self::with_interval(label, PROGRESS_INTERVAL)
    }

    pub fn with_interval(label: &'static str, interval: Duration) -> Self {
        Self {
            label,
            interval,
            last: Instant::now(),
            count: 0,
        }
    }

    /// Count one unit of work; returns true when an event was emitted.
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.last.elapsed() < self.interval {
            return false;
        }
        self.last = Instant::now();
        tracing::debug!(operation = self.label, visited = self.count, "progress");
        true
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}
