//! Progress tracking utilities
//!
//! A thread-safe counter that logs each time it crosses a multiple of its interval.

use log::{Level, log};
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe progress tracker for logging progress at regular intervals.
///
/// # Example
/// ```
/// use mapcons_consensus::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Loaded records").with_interval(100);
/// for _ in 0..250 {
///     tracker.log_if_needed(1); // logs at 100 and 200
/// }
/// tracker.log_final(); // logs "Loaded records 250 (complete)"
/// ```
pub struct ProgressTracker {
    interval: u64,
    message: String,
    level: Level,
    count: AtomicU64,
}

impl ProgressTracker {
    /// Creates a tracker with the default interval of 100,000, logging at info level.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            interval: 100_000,
            message: message.into(),
            level: Level::Info,
            count: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Adds `additional` to the count and logs every interval boundary crossed.
    ///
    /// Returns `true` if the count now sits exactly on a boundary.
    pub fn log_if_needed(&self, additional: u64) -> bool {
        if additional == 0 {
            let count = self.count.load(Ordering::Relaxed);
            return count > 0 && count % self.interval == 0;
        }

        let prev = self.count.fetch_add(additional, Ordering::Relaxed);
        let new_count = prev + additional;
        for i in (prev / self.interval + 1)..=(new_count / self.interval) {
            log!(self.level, "{} {}", self.message, i * self.interval);
        }
        new_count % self.interval == 0
    }

    /// Logs the final count unless the last boundary already reported it.
    pub fn log_final(&self) {
        if !self.log_if_needed(0) {
            let count = self.count.load(Ordering::Relaxed);
            if count > 0 {
                log!(self.level, "{} {} (complete)", self.message, count);
            }
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
