//! Backpressure configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Policy applied when the batch queue is full
///
/// Classification is far cheaper than batch arrival, so a full queue is an
/// anomaly either way; a dropped batch can at worst delay one edge by one
/// batch because the detector latches persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropPolicy {
    /// Drop the incoming batch
    #[default]
    DropNewest,
}

/// Backpressure configuration
#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    /// Channel capacity
    pub channel_capacity: usize,

    /// Drop policy when full
    pub drop_policy: DropPolicy,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
            drop_policy: DropPolicy::DropNewest,
        }
    }
}

/// Stream metrics
#[derive(Debug, Default)]
pub struct StreamMetrics {
    /// Total batches received from the source
    pub batches_received: AtomicU64,

    /// Total samples inside received batches
    pub samples_received: AtomicU64,

    /// Total batches dropped
    pub batches_dropped: AtomicU64,

    /// Current queue length
    pub queue_len: AtomicUsize,
}

impl StreamMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record batch received
    pub fn record_received(&self, samples: usize) {
        self.batches_received.fetch_add(1, Ordering::Relaxed);
        self.samples_received
            .fetch_add(samples as u64, Ordering::Relaxed);
    }

    /// Record batch dropped
    pub fn record_dropped(&self) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_received: self.batches_received.load(Ordering::Relaxed),
            samples_received: self.samples_received.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub batches_received: u64,
    pub samples_received: u64,
    pub batches_dropped: u64,
    pub queue_len: usize,
}
