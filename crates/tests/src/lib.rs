//! # Integration Tests
//!
//! Cross-crate integration and end-to-end tests.
//!
//! Covers:
//! - Full mock recordings (no capture system, no hardware)
//! - Lifecycle failure scenarios across crate boundaries
//! - Detector-to-dispatcher wiring against the real worker loops

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use contracts::{CaptureState, EventKind, RecordingPlan};
    use lifecycle::{Recording, RecordingConfig};

    fn plan(duration_sec: f64, gait: bool) -> RecordingPlan {
        let toml = format!(
            "[capture]\nduration_sec = {duration_sec}\n\n[gait]\nenabled = {gait}\n"
        );
        config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
            .unwrap()
    }

    fn recording(plan: RecordingPlan, output: &str) -> Recording {
        Recording::new(RecordingConfig {
            plan,
            output: PathBuf::from(output),
            buffer_size: 100,
            metrics_port: None,
            mock: true,
        })
    }

    /// End-to-end mock recording: connect → start → start pair → wait →
    /// end pair → stop/save → cleanup.
    #[tokio::test]
    async fn test_e2e_mock_recording() {
        let stats = recording(plan(0.6, false), "e2e.qtm").run().await.unwrap();

        assert_eq!(stats.final_state, CaptureState::Closed);
        assert!(stats.start_confirmed);
        assert_eq!(stats.saved_to, Some(PathBuf::from("e2e.qtm")));

        // Exactly one synchronized pair at each end of the window
        assert_eq!(stats.events.count_of("TaskStart"), 1);
        assert_eq!(stats.events.count_of("TaskEnd"), 1);
        assert_eq!(stats.events.incomplete, 0);
        assert!(stats.detector.is_none());
    }

    /// With gait detection enabled the detector sees the synthetic stream
    /// and classifies at least one full step.
    #[tokio::test]
    async fn test_e2e_mock_recording_with_gait() {
        let stats = recording(plan(2.0, true), "gait.qtm").run().await.unwrap();

        assert_eq!(stats.final_state, CaptureState::Closed);

        let detector = stats.detector.expect("detector report expected");
        assert!(detector.batches > 0, "stream delivered no batches");
        assert!(detector.heel_strikes >= 1, "no heel-strike detected");
        assert!(detector.toe_offs >= 1, "no toe-off detected");
        assert_eq!(detector.stream_faults, 0);

        let stream = stats.stream.expect("stream metrics expected");
        assert!(stream.samples_received > 0);
    }

    /// duration=10 schedules the end pair 9.5s after the confirmed start,
    /// independent of detector activity.
    #[tokio::test(start_paused = true)]
    async fn test_end_dispatch_scheduled_at_duration_minus_lead() {
        let begin = tokio::time::Instant::now();
        let stats = recording(plan(10.0, false), "timed.qtm").run().await.unwrap();

        let elapsed = begin.elapsed();
        assert!(
            elapsed >= Duration::from_millis(9_500),
            "end pair fired early: {elapsed:?}"
        );
        assert!(
            elapsed < Duration::from_secs(10),
            "end pair fired after the window closed: {elapsed:?}"
        );
        assert_eq!(stats.events.count_of(EventKind::TaskEnd.marker()), 1);
    }
}

#[cfg(test)]
mod failure_tests {
    use std::path::PathBuf;

    use capture_client::{MockCaptureClient, MockConfig};
    use contracts::{CaptureConfig, CaptureState, SessionConfig};
    use lifecycle::{CaptureController, LifecycleError};

    fn capture(duration: f64) -> CaptureConfig {
        CaptureConfig {
            duration_sec: duration,
            confirm_timeout_sec: 5.0,
            end_lead_sec: 0.5,
            output: None,
        }
    }

    /// Two consecutive start rejections: exactly 2 attempts, Aborted state,
    /// and no marker was ever dispatched.
    #[tokio::test]
    async fn test_double_start_rejection_aborts_without_dispatch() {
        let client = MockCaptureClient::with_config(MockConfig {
            start_rejections: 2,
            ..Default::default()
        });
        let (mut controller, client) =
            CaptureController::connect(client, &SessionConfig::default(), &capture(10.0))
                .await
                .unwrap();

        let err = controller.start_with_retry().await.unwrap_err();
        assert!(matches!(err, LifecycleError::StartExhausted { .. }));
        assert_eq!(controller.state(), CaptureState::Aborted);
        assert_eq!(client.start_attempts(), 2);
        assert!(client.markers().is_empty());

        // Cleanup still releases the collaborator
        controller.abort_cleanup().await;
        assert!(client.is_released());
        assert!(client.is_disconnected());
    }

    /// A suppressed stop confirmation is non-fatal; the session still saves.
    #[tokio::test(start_paused = true)]
    async fn test_stop_confirmation_timeout_still_saves() {
        let client = MockCaptureClient::with_config(MockConfig {
            suppress_stopped_event: true,
            ..Default::default()
        });
        let (mut controller, client) =
            CaptureController::connect(client, &SessionConfig::default(), &capture(10.0))
                .await
                .unwrap();

        controller.start_with_retry().await.unwrap();
        controller
            .stop_and_save(&PathBuf::from("late.qtm"))
            .await
            .unwrap();

        assert_eq!(controller.state(), CaptureState::Saved);
        assert_eq!(client.saved_to(), Some(PathBuf::from("late.qtm")));
    }

    /// A failing save is fatal and aborts the lifecycle.
    #[tokio::test]
    async fn test_save_failure_aborts() {
        let client = MockCaptureClient::with_config(MockConfig {
            fail_save: true,
            ..Default::default()
        });
        let (mut controller, _client) =
            CaptureController::connect(client, &SessionConfig::default(), &capture(10.0))
                .await
                .unwrap();

        controller.start_with_retry().await.unwrap();
        let result = controller.stop_and_save(&PathBuf::from("doomed.qtm")).await;
        assert!(result.is_err());
        assert_eq!(controller.state(), CaptureState::Aborted);
    }
}

#[cfg(test)]
mod stream_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use capture_client::{MockGaitProfile, MockGaitSource};
    use contracts::{ContractError, MarkerSink, PlateMapping, TriggerMap};
    use dispatcher::{PulseChannel, PulseChannelConfig, RecordingLine, TriggerDispatcher};
    use gait_detector::{DetectorTask, GaitDetectorConfig};
    use ingestion::SampleStream;

    #[derive(Clone, Default)]
    struct RecordingSink {
        markers: Arc<Mutex<Vec<String>>>,
    }

    impl MarkerSink for RecordingSink {
        async fn set_marker(&self, name: &str) -> Result<(), ContractError> {
            self.markers.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    /// Mock source → ingestion → detector → dispatcher → marker sink + line,
    /// with strictly alternating sides from the configured first side.
    #[tokio::test]
    async fn test_stream_to_hardware_wiring() {
        let plates = PlateMapping {
            front_channel: 2,
            back_channel: 8,
        };

        // Fast synthetic gait: 4 full steps in ~400ms
        let source = MockGaitSource::new(MockGaitProfile {
            batch_rate_hz: 100.0,
            sample_rate_hz: 500.0,
            step_period_sec: 0.1,
            plates,
            ..Default::default()
        });

        let mut stream = SampleStream::new(100);
        stream.register_source(Box::new(source));
        let rx = stream.take_receiver().unwrap();

        let sink = RecordingSink::default();
        let line = RecordingLine::new();
        let codes = line.levels();
        let pulse = PulseChannel::spawn(
            Box::new(line),
            PulseChannelConfig {
                pulse_width: Duration::from_millis(1),
                workers: 2,
                queue_capacity: 64,
            },
        );
        let (trigger_dispatcher, handle) = TriggerDispatcher::new(sink.clone(), pulse, 64);
        let dispatcher_task = trigger_dispatcher.spawn();

        let detector = DetectorTask::new(
            GaitDetectorConfig {
                threshold: 20.0,
                plates,
                first_strike_is_right: true,
            },
            rx,
            handle,
            TriggerMap::default(),
        );
        let detector_task = detector.spawn();

        stream.start();
        tokio::time::sleep(Duration::from_millis(400)).await;
        stream.stop();
        drop(stream);

        let report = detector_task.await.unwrap();
        dispatcher_task.await.unwrap();

        assert!(report.heel_strikes >= 2, "report: {report:?}");
        assert!(report.toe_offs >= 1, "report: {report:?}");

        // Sides alternate strictly: first strike right, second left
        let markers = sink.markers.lock().unwrap().clone();
        let strikes: Vec<&String> = markers.iter().filter(|m| m.ends_with("HS")).collect();
        assert_eq!(strikes[0], "RHS");
        if strikes.len() > 1 {
            assert_eq!(strikes[1], "LHS");
        }

        // Every pulse left the line back at idle
        let codes = codes.lock().unwrap();
        assert_eq!(codes.iter().filter(|&&c| c == 0).count(), codes.len() / 2);
    }
}
