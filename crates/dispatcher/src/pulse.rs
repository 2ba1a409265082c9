//! PulseChannel - bounded worker pool over the trigger line
//!
//! A pulse is blocking at the hardware level (set code, hold, reset), so
//! execution is offloaded to the blocking pool; worker tasks only schedule
//! and report. With more than one worker, two pulses may be in flight
//! concurrently; the line mutex keeps each code/hold/reset triple intact,
//! but pulse order across the two dispatch paths is not guaranteed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{ContractError, TriggerCode, TriggerLine};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::metrics::PulseMetrics;

/// Pulse channel configuration
#[derive(Debug, Clone)]
pub struct PulseChannelConfig {
    /// Hold time between set and reset
    pub pulse_width: Duration,
    /// Worker pool size; 1 serializes pulse ordering
    pub workers: usize,
    /// Queue capacity shared by both dispatch paths
    pub queue_capacity: usize,
}

impl Default for PulseChannelConfig {
    fn default() -> Self {
        Self {
            pulse_width: Duration::from_millis(10),
            workers: 2,
            queue_capacity: 32,
        }
    }
}

struct PulseCommand {
    code: TriggerCode,
    done: Option<oneshot::Sender<Result<(), ContractError>>>,
}

/// Handle to the pulse worker pool
pub struct PulseChannel {
    tx: Sender<PulseCommand>,
    metrics: Arc<PulseMetrics>,
    workers: Vec<JoinHandle<()>>,
    device: String,
}

impl PulseChannel {
    /// Spawn the worker pool over `line`
    pub fn spawn(line: Box<dyn TriggerLine>, config: PulseChannelConfig) -> Self {
        let device = line.describe().to_string();
        let line = Arc::new(Mutex::new(line));
        let metrics = Arc::new(PulseMetrics::new());
        let (tx, rx) = bounded(config.queue_capacity);

        let workers = (0..config.workers.max(1))
            .map(|index| {
                tokio::spawn(pulse_worker(
                    index,
                    rx.clone(),
                    Arc::clone(&line),
                    config.pulse_width,
                    Arc::clone(&metrics),
                    device.clone(),
                ))
            })
            .collect();

        Self {
            tx,
            metrics,
            workers,
            device,
        }
    }

    /// Device description for logging
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<PulseMetrics> {
        &self.metrics
    }

    /// Fire a pulse and wait until it completed (or failed)
    ///
    /// The synchronized half of a dispatch.
    pub async fn fire(&self, code: TriggerCode) -> Result<(), ContractError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(PulseCommand {
                code,
                done: Some(done_tx),
            })
            .await
            .map_err(|_| ContractError::hardware(&self.device, "pulse workers stopped"))?;
        self.metrics.set_queue_len(self.tx.len());

        done_rx
            .await
            .map_err(|_| ContractError::hardware(&self.device, "pulse worker dropped"))?
    }

    /// Fire a pulse without waiting for completion
    ///
    /// The fire-and-forget path; a full queue drops the pulse and reports it.
    pub fn fire_detached(&self, code: TriggerCode) -> bool {
        match self.tx.try_send(PulseCommand { code, done: None }) {
            Ok(()) => {
                self.metrics.set_queue_len(self.tx.len());
                true
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.inc_dropped_count();
                warn!(code = %code, "pulse queue full, pulse dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                error!(code = %code, "pulse workers closed unexpectedly");
                false
            }
        }
    }

    /// Shutdown the worker pool gracefully
    ///
    /// Queued pulses drain before the workers exit.
    #[instrument(name = "pulse_channel_shutdown", skip(self))]
    pub async fn shutdown(self) {
        drop(self.tx);
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!(error = ?e, "pulse worker panicked");
            }
        }
        debug!("pulse channel shutdown complete");
    }
}

/// Worker task: executes pulses on the blocking pool and reports back
async fn pulse_worker(
    index: usize,
    rx: Receiver<PulseCommand>,
    line: Arc<Mutex<Box<dyn TriggerLine>>>,
    pulse_width: Duration,
    metrics: Arc<PulseMetrics>,
    device: String,
) {
    debug!(worker = index, "pulse worker started");

    while let Ok(command) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        let worker_line = Arc::clone(&line);
        let code = command.code;
        let joined =
            tokio::task::spawn_blocking(move || execute_pulse(&worker_line, code, pulse_width))
                .await;

        let result = match joined {
            Ok(result) => result,
            Err(e) => Err(ContractError::hardware(
                &device,
                format!("pulse task panicked: {e}"),
            )),
        };

        match &result {
            Ok(()) => metrics.inc_fired_count(),
            Err(e) => {
                metrics.inc_failure_count();
                error!(worker = index, code = %code, error = %e, "pulse failed");
                // Continue processing - a hardware fault never aborts the session
            }
        }

        if let Some(done) = command.done {
            let _ = done.send(result);
        }
    }

    debug!(worker = index, "pulse worker stopped");
}

/// One pulse: set code, hold, reset to idle
///
/// The line mutex is held across the whole triple so concurrent workers can
/// never tear a pulse.
fn execute_pulse(
    line: &Mutex<Box<dyn TriggerLine>>,
    code: TriggerCode,
    pulse_width: Duration,
) -> Result<(), ContractError> {
    let mut line = line.lock().unwrap();
    line.set_level(code.value())?;
    std::thread::sleep(pulse_width);
    line.set_level(0)
}
