//! Pulse channel metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for the pulse worker pool
#[derive(Debug, Default)]
pub struct PulseMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Total pulses completed
    fired_count: AtomicU64,
    /// Total pulse failures
    failure_count: AtomicU64,
    /// Total fire-and-forget pulses dropped on a full queue
    dropped_count: AtomicU64,
}

impl PulseMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current queue length
    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    /// Set current queue length
    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get total fired count
    pub fn fired_count(&self) -> u64 {
        self.fired_count.load(Ordering::Relaxed)
    }

    /// Increment fired count
    pub fn inc_fired_count(&self) {
        self.fired_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get dropped count
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Increment dropped count
    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> PulseMetricsSnapshot {
        PulseMetricsSnapshot {
            queue_len: self.queue_len(),
            fired_count: self.fired_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
        }
    }
}

/// Snapshot of pulse metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct PulseMetricsSnapshot {
    pub queue_len: usize,
    pub fired_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
}
