//! Progress tracking utilities
//!
//! This module provides a progress tracker for logging progress at regular
//! intervals. The tracker maintains an internal count and logs when interval
//! boundaries are crossed.

use crate::logging::format_count;
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// Progress tracker for logging progress at regular intervals.
///
/// Maintains an internal count and logs progress messages when the count
/// crosses interval boundaries.
///
/// # Example
/// ```
/// use flowkit_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Read records").with_interval(100);
///
/// for _ in 0..250 {
///     tracker.log_if_needed(1); // Logs at 100, 200
/// }
/// tracker.log_final(); // Logs "Read records 250 (complete)"
/// ```
pub struct ProgressTracker {
    /// The logging interval - progress is logged when count crosses multiples of this.
    interval: u64,
    /// Message prefix for log output.
    message: String,
    /// Internal count of items processed.
    count: AtomicU64,
}

impl ProgressTracker {
    /// Create a new progress tracker with the specified message.
    ///
    /// The tracker starts with a count of 0 and a default interval of 1,000,000.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 1_000_000, message: message.into(), count: AtomicU64::new(0) }
    }

    /// Set the logging interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    /// Add to the count and log if an interval boundary was crossed.
    pub fn log_if_needed(&self, additional: u64) {
        let previous = self.count.fetch_add(additional, Ordering::Relaxed);
        let current = previous + additional;
        if current / self.interval > previous / self.interval {
            let boundary = (current / self.interval) * self.interval;
            info!("{} {}", self.message, format_count(boundary));
        }
    }

    /// Current count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Log the final count if it is not exactly on an interval boundary.
    pub fn log_final(&self) {
        let current = self.count();
        if current % self.interval != 0 {
            info!("{} {} (complete)", self.message, format_count(current));
        }
    }
}
