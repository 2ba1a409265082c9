//! Recording orchestrator - coordinates all components
//!
//! Wires the connected client, hardware line, dispatcher, ingestion and the
//! optional detector, then drives the capture sequence: start pair →
//! streaming → bounded wait → end pair → stop/save. Cleanup runs on every
//! exit path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use capture_client::{CaptureClient, MockCaptureClient, MockConfig, QtmClient};
use contracts::{DispatchRequest, EventKind, RecordingPlan};
use dispatcher::{DispatcherHandle, PulseChannel, PulseChannelConfig, TriggerDispatcher};
use gait_detector::{DetectorTask, GaitDetectorConfig};
use ingestion::SampleStream;
use observability::EventTally;
use tracing::{info, warn};

use crate::controller::CaptureController;
use crate::stats::RecordingStats;

/// Recording configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// The validated recording plan
    pub plan: RecordingPlan,

    /// Resolved output path for the saved session
    pub output: PathBuf,

    /// Channel buffer size for the sample path
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Run against the mock client instead of a live capture system
    pub mock: bool,
}

/// Main recording orchestrator
pub struct Recording {
    config: RecordingConfig,
}

impl Recording {
    /// Create a new recording with the given configuration
    pub fn new(config: RecordingConfig) -> Self {
        Self { config }
    }

    /// Run the recording to completion
    pub async fn run(self) -> Result<RecordingStats> {
        if self.config.mock {
            self.run_mock().await
        } else {
            self.run_real().await
        }
    }

    /// Run against a live capture system
    async fn run_real(self) -> Result<RecordingStats> {
        let client = QtmClient::new(self.config.plan.session.rt_version.clone());
        self.run_session(client).await
    }

    /// Run against the mock client
    async fn run_mock(self) -> Result<RecordingStats> {
        info!("running in MOCK mode (no capture system required)");
        let client = MockCaptureClient::with_config(MockConfig {
            gait: capture_client::MockGaitProfile {
                plates: self.config.plan.gait.plates,
                ..Default::default()
            },
            ..Default::default()
        });
        self.run_session(client).await
    }

    /// Common sequence shared by mock and real modes
    async fn run_session<C: CaptureClient + 'static>(self, client: C) -> Result<RecordingStats> {
        let wall_start = std::time::Instant::now();
        let plan = &self.config.plan;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!(port, "metrics endpoint available");
        }

        let (mut controller, client) =
            CaptureController::connect(client, &plan.session, &plan.capture)
                .await
                .context("failed to connect to the capture host")?;

        // Hardware line degrades to the null stub when unavailable
        let line = dispatcher::open_line(
            plan.triggers.enabled,
            &plan.triggers.device,
            plan.triggers.baud,
        );
        let pulse = PulseChannel::spawn(
            line,
            PulseChannelConfig {
                pulse_width: Duration::from_millis(plan.triggers.pulse_ms),
                workers: plan.triggers.workers,
                queue_capacity: plan.triggers.queue_capacity,
            },
        );
        let (trigger_dispatcher, dispatch) =
            TriggerDispatcher::new(Arc::clone(&client), pulse, plan.triggers.queue_capacity);
        let dispatcher_task = trigger_dispatcher.spawn();

        let result = self.run_capture(&mut controller, &client, dispatch).await;

        // Every handle is gone once run_capture returns; the dispatcher
        // drains in-flight dispatches and stops
        if tokio::time::timeout(Duration::from_secs(5), dispatcher_task)
            .await
            .is_err()
        {
            warn!("dispatcher did not shut down in time");
        }

        // Cleanup always runs, success or failure
        controller.abort_cleanup().await;

        let mut stats = result?;
        stats.duration = wall_start.elapsed();
        stats.final_state = controller.state();
        Ok(stats)
    }

    async fn run_capture<C: CaptureClient + 'static>(
        &self,
        controller: &mut CaptureController<C>,
        client: &Arc<C>,
        dispatch: DispatcherHandle,
    ) -> Result<RecordingStats> {
        let plan = &self.config.plan;
        let codes = plan.triggers.codes;
        let mut stats = RecordingStats::default();
        let mut tally = EventTally::new();

        controller
            .start_with_retry()
            .await
            .context("could not start capture")?;
        stats.start_confirmed = controller.confirm_started().await?;

        let outcome = dispatch
            .dispatch(DispatchRequest::for_event(EventKind::TaskStart, &codes))
            .await
            .context("start dispatch failed")?;
        tally.record(outcome.kind, outcome.all_ok());
        info!(code = %codes.task_start, "TaskStart pair dispatched");

        // Optional online gait detection on the sample stream
        let mut stream = None;
        let mut detector = None;
        if plan.gait.enabled {
            let source = client
                .stream_samples()
                .await
                .context("failed to start the sample stream")?;
            let mut sample_stream = SampleStream::new(self.config.buffer_size);
            sample_stream.register_source(source);
            let rx = sample_stream
                .take_receiver()
                .context("sample stream receiver already taken")?;
            sample_stream.start();

            detector = Some(
                DetectorTask::new(
                    GaitDetectorConfig::from(&plan.gait),
                    rx,
                    dispatch.clone(),
                    codes,
                )
                .spawn(),
            );
            stream = Some(sample_stream);
            controller.mark_streaming();
            info!(
                threshold = plan.gait.threshold,
                front = plan.gait.plates.front_channel,
                back = plan.gait.plates.back_channel,
                "online gait detection active"
            );
        }

        // Wait until near the end of the active window, measured from the
        // confirmed start
        let window = Duration::from_secs_f64(
            (plan.capture.duration_sec - plan.capture.end_lead_sec).max(0.0),
        );
        match controller.started_at() {
            Some(started_at) => tokio::time::sleep_until(started_at + window).await,
            None => tokio::time::sleep(window).await,
        }

        let outcome = dispatch
            .dispatch(DispatchRequest::for_event(EventKind::TaskEnd, &codes))
            .await
            .context("end dispatch failed")?;
        tally.record(outcome.kind, outcome.all_ok());
        info!(code = %codes.task_end, "TaskEnd pair dispatched");

        // Tear down streaming: sever delivery, close the channel, join the
        // detector
        if let Some(sample_stream) = stream.take() {
            sample_stream.stop();
            stats.stream = Some(sample_stream.metrics().snapshot());
        }
        if let Some(task) = detector.take() {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(Ok(report)) => stats.detector = Some(report),
                Ok(Err(e)) => warn!(error = ?e, "detector task panicked"),
                Err(_) => warn!("detector did not stop in time"),
            }
        }

        controller
            .stop_and_save(&self.config.output)
            .await
            .context("failed to stop and save the session")?;
        stats.saved_to = Some(self.config.output.clone());

        stats.events = tally.summary();
        Ok(stats)
    }
}
