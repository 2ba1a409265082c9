//! TriggerDispatcher - the synchronized marker/pulse pair
//!
//! One worker loop owns the marker sink and the pulse channel. Each request
//! runs as its own task so the two dispatch paths never serialize behind
//! each other; within a request the marker send and the pulse fire are
//! issued concurrently and both are awaited before the outcome is reported.

use std::sync::Arc;

use contracts::{DispatchRequest, EventKind, MarkerSink};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, instrument, warn};

use crate::error::DispatcherError;
use crate::pulse::PulseChannel;

/// Result of one dispatch: which halves succeeded
///
/// Failure of one side never cancels the other; both flags are always the
/// result of an actual attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub kind: EventKind,
    pub marker_ok: bool,
    pub pulse_ok: bool,
}

impl DispatchOutcome {
    pub fn all_ok(&self) -> bool {
        self.marker_ok && self.pulse_ok
    }
}

struct DispatchMessage {
    request: DispatchRequest,
    completion: Option<oneshot::Sender<DispatchOutcome>>,
}

/// Clonable handle into the dispatcher worker
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<DispatchMessage>,
}

impl DispatcherHandle {
    /// Synchronized dispatch: returns only after both halves were attempted
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchOutcome, DispatcherError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(DispatchMessage {
                request,
                completion: Some(done_tx),
            })
            .await
            .map_err(|_| DispatcherError::WorkerStopped)?;
        done_rx.await.map_err(|_| DispatcherError::WorkerStopped)
    }

    /// Fire-and-forget dispatch used by the streaming detector
    ///
    /// Never blocks the caller; a full queue drops the event and reports it.
    pub fn dispatch_detached(&self, request: DispatchRequest) -> Result<(), DispatcherError> {
        self.tx
            .try_send(DispatchMessage {
                request,
                completion: None,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => DispatcherError::QueueFull {
                    kind: request.kind,
                },
                mpsc::error::TrySendError::Closed(_) => DispatcherError::WorkerStopped,
            })
    }
}

/// The dispatcher worker
pub struct TriggerDispatcher<M> {
    marker_sink: M,
    pulse: Arc<PulseChannel>,
    rx: mpsc::Receiver<DispatchMessage>,
}

impl<M> TriggerDispatcher<M>
where
    M: MarkerSink + Clone + Send + Sync + 'static,
{
    /// Create the worker and its handle
    pub fn new(
        marker_sink: M,
        pulse: PulseChannel,
        queue_capacity: usize,
    ) -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        (
            Self {
                marker_sink,
                pulse: Arc::new(pulse),
                rx,
            },
            DispatcherHandle { tx },
        )
    }

    /// Run the dispatcher worker loop
    ///
    /// Consumes requests until every handle is dropped, then drains in-flight
    /// dispatches and shuts the pulse pool down.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) {
        info!(device = %self.pulse.device(), "dispatcher started");

        let mut inflight = JoinSet::new();
        while let Some(message) = self.rx.recv().await {
            let sink = self.marker_sink.clone();
            let pulse = Arc::clone(&self.pulse);
            inflight.spawn(async move {
                let outcome = execute(sink, pulse, message.request).await;
                if let Some(done) = message.completion {
                    let _ = done.send(outcome);
                }
            });

            // Reap finished dispatches without blocking the queue
            while inflight.try_join_next().is_some() {}
        }

        info!("dispatcher input closed, shutting down");
        while inflight.join_next().await.is_some() {}

        match Arc::try_unwrap(self.pulse) {
            Ok(pulse) => pulse.shutdown().await,
            Err(_) => warn!("pulse channel still shared, skipping pool shutdown"),
        }

        info!("dispatcher shutdown complete");
    }

    /// Spawn the worker as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }
}

/// One dispatch: fire both halves together, await both, report independently
async fn execute<M: MarkerSink>(
    sink: M,
    pulse: Arc<PulseChannel>,
    request: DispatchRequest,
) -> DispatchOutcome {
    let (marker_result, pulse_result) = tokio::join!(
        sink.set_marker(request.marker()),
        pulse.fire(request.code),
    );

    if let Err(e) = &marker_result {
        error!(event = %request.kind, error = %e, "marker half failed");
    }
    if let Err(e) = &pulse_result {
        error!(event = %request.kind, error = %e, "pulse half failed");
    }

    let outcome = DispatchOutcome {
        kind: request.kind,
        marker_ok: marker_result.is_ok(),
        pulse_ok: pulse_result.is_ok(),
    };
    observability::record_dispatch(outcome.kind, outcome.marker_ok, outcome.pulse_ok);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::RecordingLine;
    use crate::pulse::PulseChannelConfig;
    use contracts::{ContractError, TriggerMap};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Recording marker sink with optional failure injection
    #[derive(Clone, Default)]
    struct RecordingSink {
        markers: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RecordingSink {
        fn markers(&self) -> Vec<String> {
            self.markers.lock().unwrap().clone()
        }
    }

    impl MarkerSink for RecordingSink {
        async fn set_marker(&self, name: &str) -> Result<(), ContractError> {
            if self.fail {
                return Err(ContractError::Other("mock marker failure".into()));
            }
            self.markers.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    fn pulse_channel(line: RecordingLine) -> PulseChannel {
        PulseChannel::spawn(
            Box::new(line),
            PulseChannelConfig {
                pulse_width: Duration::from_millis(1),
                workers: 1,
                queue_capacity: 8,
            },
        )
    }

    #[tokio::test]
    async fn test_dispatch_emits_both_halves() {
        let sink = RecordingSink::default();
        let line = RecordingLine::new();
        let levels = line.levels();

        let (dispatcher, handle) = TriggerDispatcher::new(sink.clone(), pulse_channel(line), 8);
        let worker = dispatcher.spawn();

        let request = DispatchRequest::for_event(EventKind::TaskStart, &TriggerMap::default());
        let outcome = handle.dispatch(request).await.unwrap();
        assert!(outcome.all_ok());

        drop(handle);
        worker.await.unwrap();

        assert_eq!(sink.markers(), vec!["TaskStart"]);
        assert_eq!(*levels.lock().unwrap(), vec![2, 0]);
    }

    #[tokio::test]
    async fn test_dispatch_parity_on_marker_failure() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let line = RecordingLine::new();
        let levels = line.levels();

        let (dispatcher, handle) = TriggerDispatcher::new(sink, pulse_channel(line), 8);
        let worker = dispatcher.spawn();

        let request = DispatchRequest::for_event(EventKind::TaskEnd, &TriggerMap::default());
        let outcome = handle.dispatch(request).await.unwrap();

        // The pulse half still fired even though the marker failed
        assert!(!outcome.marker_ok);
        assert!(outcome.pulse_ok);

        drop(handle);
        worker.await.unwrap();
        assert_eq!(*levels.lock().unwrap(), vec![3, 0]);
    }

    #[tokio::test]
    async fn test_detached_dispatch_completes_eventually() {
        let sink = RecordingSink::default();
        let line = RecordingLine::new();
        let levels = line.levels();

        let (dispatcher, handle) = TriggerDispatcher::new(sink.clone(), pulse_channel(line), 8);
        let worker = dispatcher.spawn();

        let map = TriggerMap::default();
        handle
            .dispatch_detached(DispatchRequest::for_event(EventKind::RightHeelStrike, &map))
            .unwrap();
        handle
            .dispatch_detached(DispatchRequest::for_event(EventKind::RightToeOff, &map))
            .unwrap();

        // Dropping the handle closes the queue; the worker drains in-flight work
        drop(handle);
        worker.await.unwrap();

        let mut markers = sink.markers();
        markers.sort();
        assert_eq!(markers, vec!["RHS", "RTO"]);
        assert_eq!(levels.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_dispatch_without_worker_errors() {
        let (dispatcher, handle) = TriggerDispatcher::new(
            RecordingSink::default(),
            pulse_channel(RecordingLine::new()),
            8,
        );
        drop(dispatcher);

        let request = DispatchRequest::for_event(EventKind::TaskStart, &TriggerMap::default());
        assert!(matches!(
            handle.dispatch(request).await.unwrap_err(),
            DispatcherError::WorkerStopped
        ));
        assert!(matches!(
            handle.dispatch_detached(request).unwrap_err(),
            DispatcherError::WorkerStopped
        ));
    }
}
