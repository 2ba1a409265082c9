//! Mock capture client
//!
//! Unit/integration test double for the session collaborator, supporting
//! failure-scenario injection.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use contracts::{ContractError, MarkerSink, SampleSource, SessionEvent};
use tracing::instrument;

use crate::client::CaptureClient;
use crate::error::{CaptureClientError, Result};
use crate::mock_source::{MockGaitProfile, MockGaitSource};

/// Mock client configuration (injectable failure scenarios)
#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    /// Fail the initial connect
    pub fail_connect: bool,
    /// Number of leading `start` calls rejected with `StartRejected`
    pub start_rejections: u32,
    /// Swallow the CaptureStarted confirmation
    pub suppress_started_event: bool,
    /// Swallow the CaptureStopped confirmation
    pub suppress_stopped_event: bool,
    /// Fail the save step
    pub fail_save: bool,
    /// Waveform produced by `stream_samples`
    pub gait: MockGaitProfile,
}

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    controlled: bool,
    configured: Vec<f64>,
    started: bool,
    stopped: bool,
    markers: Vec<String>,
    saved_to: Option<PathBuf>,
    released: bool,
    disconnected: bool,
    measurements_closed: u32,
}

/// Mock capture client
pub struct MockCaptureClient {
    config: MockConfig,
    start_attempts: AtomicU32,
    state: Mutex<MockState>,
}

impl MockCaptureClient {
    /// Create a default mock client
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a mock client with injected failure scenarios
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            start_attempts: AtomicU32::new(0),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Markers recorded so far, in dispatch order
    pub fn markers(&self) -> Vec<String> {
        self.state.lock().unwrap().markers.clone()
    }

    /// Durations pushed by `configure`, in call order
    pub fn configured_durations(&self) -> Vec<f64> {
        self.state.lock().unwrap().configured.clone()
    }

    /// Total `start` calls observed
    pub fn start_attempts(&self) -> u32 {
        self.start_attempts.load(Ordering::SeqCst)
    }

    /// Save target, when `save` ran
    pub fn saved_to(&self) -> Option<PathBuf> {
        self.state.lock().unwrap().saved_to.clone()
    }

    /// `Close` calls observed (the clear-previous-session step)
    pub fn measurements_closed(&self) -> u32 {
        self.state.lock().unwrap().measurements_closed
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().unwrap().released
    }

    pub fn is_disconnected(&self) -> bool {
        self.state.lock().unwrap().disconnected
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.state.lock().unwrap().connected {
            Ok(())
        } else {
            Err(CaptureClientError::connection("not connected"))
        }
    }
}

impl Default for MockCaptureClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureClient for MockCaptureClient {
    #[instrument(name = "mock_capture_connect", skip(self), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        let _ = (host, port);
        if self.config.fail_connect {
            return Err(CaptureClientError::connection("mock connect failure"));
        }
        self.state.lock().unwrap().connected = true;
        Ok(())
    }

    #[instrument(name = "mock_capture_take_control", skip_all)]
    async fn take_control(&self, _password: &str) -> Result<()> {
        self.ensure_connected()?;
        self.state.lock().unwrap().controlled = true;
        Ok(())
    }

    #[instrument(name = "mock_capture_close_measurement", skip(self))]
    async fn close_measurement(&self) -> Result<()> {
        self.ensure_connected()?;
        self.state.lock().unwrap().measurements_closed += 1;
        Ok(())
    }

    #[instrument(name = "mock_capture_configure", skip(self), fields(duration_sec = duration.as_secs_f64()))]
    async fn configure(&self, duration: Duration) -> Result<()> {
        self.ensure_connected()?;
        self.state
            .lock()
            .unwrap()
            .configured
            .push(duration.as_secs_f64());
        Ok(())
    }

    #[instrument(name = "mock_capture_start", skip(self))]
    async fn start(&self) -> Result<()> {
        self.ensure_connected()?;
        let attempt = self.start_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.config.start_rejections {
            return Err(CaptureClientError::start_rejected(format!(
                "mock rejection ({attempt})"
            )));
        }
        self.state.lock().unwrap().started = true;
        Ok(())
    }

    #[instrument(name = "mock_capture_await_event", skip(self), fields(event = %event))]
    async fn await_event(&self, event: SessionEvent, timeout: Duration) -> Result<()> {
        self.ensure_connected()?;
        let suppressed = match event {
            SessionEvent::CaptureStarted => self.config.suppress_started_event,
            SessionEvent::CaptureStopped => self.config.suppress_stopped_event,
            _ => false,
        };
        if suppressed {
            tokio::time::sleep(timeout).await;
            return Err(CaptureClientError::EventTimeout {
                event,
                waited_ms: timeout.as_millis() as u64,
            });
        }
        Ok(())
    }

    #[instrument(name = "mock_capture_stream_samples", skip(self))]
    async fn stream_samples(&self) -> Result<Box<dyn SampleSource>> {
        self.ensure_connected()?;
        Ok(Box::new(MockGaitSource::new(self.config.gait.clone())))
    }

    #[instrument(name = "mock_capture_stop", skip(self))]
    async fn stop(&self) -> Result<()> {
        self.ensure_connected()?;
        self.state.lock().unwrap().stopped = true;
        Ok(())
    }

    #[instrument(name = "mock_capture_save", skip(self), fields(path = %path.display()))]
    async fn save(&self, path: &Path) -> Result<()> {
        self.ensure_connected()?;
        if self.config.fail_save {
            return Err(CaptureClientError::command("Save", "mock save failure"));
        }
        self.state.lock().unwrap().saved_to = Some(path.to_path_buf());
        Ok(())
    }

    #[instrument(name = "mock_capture_release_control", skip(self))]
    async fn release_control(&self) -> Result<()> {
        self.state.lock().unwrap().released = true;
        Ok(())
    }

    #[instrument(name = "mock_capture_disconnect", skip(self))]
    async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.connected = false;
        state.disconnected = true;
        Ok(())
    }
}

impl MarkerSink for MockCaptureClient {
    async fn set_marker(&self, name: &str) -> std::result::Result<(), ContractError> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(ContractError::connection("not connected"));
        }
        state.markers.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_sequence() {
        let mut client = MockCaptureClient::new();
        client.connect("localhost", 22223).await.unwrap();
        client.take_control("").await.unwrap();
        client.configure(Duration::from_secs_f64(10.0)).await.unwrap();
        client.start().await.unwrap();
        client.set_marker("TaskStart").await.unwrap();
        client.stop().await.unwrap();
        client.save(Path::new("out.qtm")).await.unwrap();

        assert_eq!(client.configured_durations(), vec![10.0]);
        assert_eq!(client.markers(), vec!["TaskStart"]);
        assert_eq!(client.saved_to().unwrap(), PathBuf::from("out.qtm"));
    }

    #[tokio::test]
    async fn test_mock_start_rejections() {
        let mut client = MockCaptureClient::with_config(MockConfig {
            start_rejections: 2,
            ..Default::default()
        });
        client.connect("localhost", 22223).await.unwrap();

        let first = client.start().await.unwrap_err();
        assert!(first.is_recoverable_start());
        let second = client.start().await.unwrap_err();
        assert!(second.is_recoverable_start());
        assert!(client.start().await.is_ok());
        assert_eq!(client.start_attempts(), 3);
    }

    #[tokio::test]
    async fn test_mock_suppressed_confirmation_times_out() {
        tokio::time::pause();
        let mut client = MockCaptureClient::with_config(MockConfig {
            suppress_started_event: true,
            ..Default::default()
        });
        client.connect("localhost", 22223).await.unwrap();

        let err = client
            .await_event(SessionEvent::CaptureStarted, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.is_event_timeout());

        // Other events still confirm
        client
            .await_event(SessionEvent::CaptureStopped, Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_mock_requires_connection() {
        let client = MockCaptureClient::new();
        assert!(client.start().await.is_err());
        assert!(client.set_marker("TaskStart").await.is_err());
    }
}
