//! SampleStream - ingestion entry point

use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{SampleBatch, SampleSource};
use tracing::{debug, info, instrument};

use crate::adapter::BatchAdapter;
use crate::config::{BackpressureConfig, StreamMetrics};

/// Sample stream
///
/// Owns the batch channel and the registered source adapter; consumers take
/// the receiver once and drain it in arrival order.
pub struct SampleStream {
    adapter: Option<BatchAdapter>,
    metrics: Arc<StreamMetrics>,
    tx: Sender<SampleBatch>,
    rx: Option<Receiver<SampleBatch>>,
    default_config: BackpressureConfig,
}

impl SampleStream {
    /// Create a stream with the given channel capacity
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(BackpressureConfig {
            channel_capacity,
            ..Default::default()
        })
    }

    /// Create a stream with a custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity);

        Self {
            adapter: None,
            metrics: Arc::new(StreamMetrics::new()),
            tx,
            rx: Some(rx),
            default_config: config,
        }
    }

    /// Register the sample source
    ///
    /// A previously registered source is stopped and replaced.
    #[instrument(name = "stream_register_source", skip_all, fields(source_id = %source.source_id()))]
    pub fn register_source(&mut self, source: Box<dyn SampleSource>) {
        if let Some(old) = self.adapter.take() {
            old.stop();
        }
        debug!("registered sample source");
        self.adapter = Some(BatchAdapter::new(source, self.default_config.clone()));
    }

    /// Start delivery from the registered source
    #[instrument(name = "stream_start", skip(self))]
    pub fn start(&self) {
        if let Some(adapter) = &self.adapter {
            info!(source_id = %adapter.source_id(), "starting sample stream");
            adapter.start(self.tx.clone(), Arc::clone(&self.metrics));
        }
    }

    /// Stop delivery
    #[instrument(name = "stream_stop", skip(self))]
    pub fn stop(&self) {
        if let Some(adapter) = &self.adapter {
            info!(source_id = %adapter.source_id(), "stopping sample stream");
            adapter.stop();
        }
    }

    /// Get the batch receiver
    ///
    /// Note: can only be taken once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<SampleBatch>> {
        self.rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<StreamMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Check whether the registered source is listening
    pub fn is_listening(&self) -> bool {
        self.adapter
            .as_ref()
            .map(|a| a.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for SampleStream {
    fn drop(&mut self) {
        self.stop();
    }
}
