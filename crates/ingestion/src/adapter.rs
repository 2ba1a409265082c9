//! Batch adapter
//!
//! Adapts a `SampleSource` callback into the bounded batch channel,
//! recording metrics and applying the backpressure policy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{Sender, TrySendError};
use contracts::{SampleBatch, SampleBatchCallback, SampleSource};
use tracing::{debug, trace, warn};

use crate::config::{BackpressureConfig, DropPolicy, StreamMetrics};

/// Bridges one sample source into the stream channel
pub struct BatchAdapter {
    source: Box<dyn SampleSource>,
    config: BackpressureConfig,
    listening: Arc<AtomicBool>,
}

impl BatchAdapter {
    pub fn new(source: Box<dyn SampleSource>, config: BackpressureConfig) -> Self {
        Self {
            source,
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn source_id(&self) -> &str {
        self.source.source_id()
    }

    /// Start forwarding batches into `tx`
    pub fn start(&self, tx: Sender<SampleBatch>, metrics: Arc<StreamMetrics>) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source.source_id().to_string();
        let drop_policy = self.config.drop_policy;
        let listening = Arc::clone(&self.listening);

        debug!(source_id = %source_id, "starting batch adapter");

        let callback: SampleBatchCallback = Arc::new(move |batch| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            metrics.record_received(batch.len());
            observability::record_batch_received(batch.len());
            trace!(source_id = %source_id, samples = batch.len(), "batch received");
            send_batch(&tx, batch, &metrics, &source_id, drop_policy);
        });

        self.source.listen(callback);
    }

    /// Stop the source and sever delivery
    pub fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(source_id = %self.source.source_id(), "stopping batch adapter");
            self.source.stop();
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

/// Send batch, handling the backpressure policy
#[inline]
fn send_batch(
    tx: &Sender<SampleBatch>,
    batch: SampleBatch,
    metrics: &Arc<StreamMetrics>,
    source_id: &str,
    drop_policy: DropPolicy,
) {
    match tx.try_send(batch) {
        Ok(_) => {
            metrics.update_queue_len(tx.len());
        }
        Err(TrySendError::Full(_)) => {
            metrics.record_dropped();
            match drop_policy {
                DropPolicy::DropNewest => {
                    warn!(source_id = %source_id, "batch queue full, batch dropped");
                }
            }
        }
        Err(TrySendError::Closed(_)) => {
            warn!(source_id = %source_id, "batch channel closed");
        }
    }
}
