//! Detector task
//!
//! Drains the ingestion receiver in arrival order, classifies each batch to
//! completion, and hands detected events to the dispatcher's
//! fire-and-forget path. Classification performs no blocking operation, so
//! the sample rate is never limited by pulse duration.

use async_channel::Receiver;
use contracts::{DispatchRequest, EventKind, SampleBatch, TriggerMap};
use dispatcher::DispatcherHandle;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::detector::{GaitDetectorConfig, GaitEventDetector};

/// What the detector saw over one streaming session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorReport {
    pub batches: u64,
    pub heel_strikes: u64,
    pub toe_offs: u64,
    pub stream_faults: u64,
    pub dropped_dispatches: u64,
}

impl DetectorReport {
    fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::RightHeelStrike | EventKind::LeftHeelStrike => self.heel_strikes += 1,
            EventKind::RightToeOff | EventKind::LeftToeOff => self.toe_offs += 1,
            EventKind::TaskStart | EventKind::TaskEnd => {}
        }
    }
}

/// The streaming consumer
pub struct DetectorTask {
    detector: GaitEventDetector,
    rx: Receiver<SampleBatch>,
    dispatcher: DispatcherHandle,
    codes: TriggerMap,
}

impl DetectorTask {
    pub fn new(
        config: GaitDetectorConfig,
        rx: Receiver<SampleBatch>,
        dispatcher: DispatcherHandle,
        codes: TriggerMap,
    ) -> Self {
        Self {
            detector: GaitEventDetector::new(config),
            rx,
            dispatcher,
            codes,
        }
    }

    /// Run until the batch channel closes
    #[instrument(name = "detector_run", skip(self))]
    pub async fn run(mut self) -> DetectorReport {
        // No state survives a stream (re)start
        self.detector.reset();
        info!("gait detector started");

        let mut report = DetectorReport::default();
        while let Ok(batch) = self.rx.recv().await {
            report.batches += 1;

            let events = match self.detector.process_batch(&batch) {
                Ok(events) => events,
                Err(fault) => {
                    report.stream_faults += 1;
                    observability::record_stream_fault();
                    warn!(frame_id = ?batch.frame_id, fault = %fault, "batch skipped");
                    continue;
                }
            };

            for event in events {
                report.record(event.kind);
                observability::record_gait_event(event.kind);
                debug!(
                    kind = %event.kind,
                    frame_id = ?batch.frame_id,
                    sample_index = event.sample_index,
                    "gait event detected"
                );

                let request = DispatchRequest::for_event(event.kind, &self.codes);
                if let Err(e) = self.dispatcher.dispatch_detached(request) {
                    report.dropped_dispatches += 1;
                    warn!(kind = %event.kind, error = %e, "gait dispatch dropped");
                }
            }
        }

        info!(
            heel_strikes = report.heel_strikes,
            toe_offs = report.toe_offs,
            faults = report.stream_faults,
            "gait detector stopped"
        );
        report
    }

    /// Spawn the consumer as a background task
    pub fn spawn(self) -> JoinHandle<DetectorReport> {
        tokio::spawn(async move { self.run().await })
    }
}
