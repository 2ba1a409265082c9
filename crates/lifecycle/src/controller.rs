//! Capture lifecycle controller
//!
//! The explicit state machine behind a recording:
//! `Idle → Configuring → Starting → Active → Streaming → Stopping → Saved →
//! Closed`, with `Aborted` reachable from any non-terminal state. Start
//! retries re-apply the configuration each attempt; confirmation timeouts
//! are non-fatal; cleanup always runs and never escalates its own failures.
//!
//! The controller is the sole owner of the capture-session record (state,
//! duration, start time).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use capture_client::CaptureClient;
use contracts::{CaptureConfig, CaptureState, SessionConfig, SessionEvent};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::LifecycleError;

/// Total start attempts, including the first
const START_ATTEMPTS: u32 = 2;

/// The lifecycle state machine
pub struct CaptureController<C> {
    client: Arc<C>,
    state: CaptureState,
    duration: Duration,
    confirm_timeout: Duration,
    started_at: Option<Instant>,
}

impl<C: CaptureClient> CaptureController<C> {
    /// Connect, take control and clear any previous session
    ///
    /// Returns the controller plus a shared handle to the connected client
    /// for the dispatcher's marker half. A connection failure is fatal and
    /// happens before any hardware interaction.
    #[instrument(
        name = "lifecycle_connect",
        skip(client, session, capture),
        fields(host = %session.host, port = session.port)
    )]
    pub async fn connect(
        mut client: C,
        session: &SessionConfig,
        capture: &CaptureConfig,
    ) -> Result<(Self, Arc<C>), LifecycleError> {
        info!("connecting to capture host");
        client.connect(&session.host, session.port).await?;
        client.take_control(&session.password).await?;
        clear_previous_session(&client).await;

        let client = Arc::new(client);
        let controller = Self {
            client: Arc::clone(&client),
            state: CaptureState::Idle,
            duration: Duration::from_secs_f64(capture.duration_sec),
            confirm_timeout: Duration::from_secs_f64(capture.confirm_timeout_sec),
            started_at: None,
        };
        Ok((controller, client))
    }

    /// Current lifecycle state
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// When the active window began (start, refined by confirmation)
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Configured capture duration
    pub fn duration(&self) -> Duration {
        self.duration
    }

    fn advance(&mut self, next: CaptureState) {
        debug!(from = %self.state, to = %next, "lifecycle transition");
        self.state = next;
    }

    /// Force the terminal failure state
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.advance(CaptureState::Aborted);
        }
    }

    /// Configure and start, retrying within the fixed bound
    ///
    /// Each retry re-applies the duration configuration before starting
    /// again. Exhausting the bound (or any non-recoverable failure) moves
    /// the controller to `Aborted`; the caller must not proceed to trigger
    /// dispatch afterwards.
    #[instrument(name = "lifecycle_start", skip(self))]
    pub async fn start_with_retry(&mut self) -> Result<(), LifecycleError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            self.advance(CaptureState::Configuring);
            if let Err(e) = self.client.configure(self.duration).await {
                self.abort();
                return Err(e.into());
            }

            self.advance(CaptureState::Starting);
            match self.client.start().await {
                Ok(()) => {
                    self.advance(CaptureState::Active);
                    self.started_at = Some(Instant::now());
                    info!(attempt, "capture started");
                    return Ok(());
                }
                Err(e) if e.is_recoverable_start() && attempt < START_ATTEMPTS => {
                    warn!(attempt, error = %e, "start rejected, reconfiguring before retry");
                }
                Err(e) if e.is_recoverable_start() => {
                    self.abort();
                    return Err(LifecycleError::StartExhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    self.abort();
                    return Err(e.into());
                }
            }
        }
    }

    /// Wait for the start confirmation, tolerating a timeout
    ///
    /// A timeout is non-fatal: the capture may already be running, so the
    /// controller logs a warning and proceeds. Returns whether the start was
    /// actually confirmed.
    #[instrument(name = "lifecycle_confirm_started", skip(self))]
    pub async fn confirm_started(&mut self) -> Result<bool, LifecycleError> {
        match self
            .client
            .await_event(SessionEvent::CaptureStarted, self.confirm_timeout)
            .await
        {
            Ok(()) => {
                info!("capture confirmed active");
                self.started_at = Some(Instant::now());
                Ok(true)
            }
            Err(e) if e.is_event_timeout() => {
                warn!(error = %e, "no start confirmation, proceeding");
                Ok(false)
            }
            Err(e) => {
                self.abort();
                Err(e.into())
            }
        }
    }

    /// Record that the detector is registered on the sample stream
    pub fn mark_streaming(&mut self) {
        if self.state == CaptureState::Active {
            self.advance(CaptureState::Streaming);
        }
    }

    /// Stop the capture and persist it to `path`, overwriting
    ///
    /// The stop confirmation wait is bounded and non-fatal, matching
    /// `confirm_started`.
    #[instrument(name = "lifecycle_stop_and_save", skip(self), fields(path = %path.display()))]
    pub async fn stop_and_save(&mut self, path: &Path) -> Result<(), LifecycleError> {
        self.advance(CaptureState::Stopping);
        if let Err(e) = self.client.stop().await {
            self.abort();
            return Err(e.into());
        }

        match self
            .client
            .await_event(SessionEvent::CaptureStopped, self.confirm_timeout)
            .await
        {
            Ok(()) => info!("capture stopped"),
            Err(e) if e.is_event_timeout() => {
                warn!(error = %e, "no stop confirmation, proceeding");
            }
            Err(e) => {
                self.abort();
                return Err(e.into());
            }
        }

        if let Err(e) = self.client.save(path).await {
            self.abort();
            return Err(e.into());
        }
        self.advance(CaptureState::Saved);
        info!(path = %path.display(), "session saved");
        Ok(())
    }

    /// Release control and disconnect
    ///
    /// Always runs on the exit path, success or failure; its own failures
    /// are logged and swallowed.
    #[instrument(name = "lifecycle_cleanup", skip(self))]
    pub async fn abort_cleanup(&mut self) {
        if let Err(e) = self.client.release_control().await {
            warn!(error = %e, "release control failed during cleanup");
        }
        if let Err(e) = self.client.disconnect().await {
            warn!(error = %e, "disconnect failed during cleanup");
        }
        if self.state == CaptureState::Saved {
            self.advance(CaptureState::Closed);
        } else {
            self.abort();
        }
    }
}

/// Best-effort clear of whatever the collaborator had open
///
/// Each step's failure is logged and never blocks continuation; a fresh
/// connection usually has nothing to stop.
async fn clear_previous_session<C: CaptureClient>(client: &C) {
    if let Err(e) = client.stop().await {
        debug!(error = %e, "no previous capture to stop");
    }
    if let Err(e) = client.close_measurement().await {
        debug!(error = %e, "no previous measurement to close");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_client::{MockCaptureClient, MockConfig};
    use contracts::MarkerSink;

    fn session() -> SessionConfig {
        SessionConfig::default()
    }

    fn capture(duration: f64) -> CaptureConfig {
        CaptureConfig {
            duration_sec: duration,
            confirm_timeout_sec: 5.0,
            end_lead_sec: 0.5,
            output: None,
        }
    }

    async fn connected(
        config: MockConfig,
    ) -> (
        CaptureController<MockCaptureClient>,
        Arc<MockCaptureClient>,
    ) {
        CaptureController::connect(
            MockCaptureClient::with_config(config),
            &session(),
            &capture(10.0),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_connect_clears_previous_session() {
        let (controller, client) = connected(MockConfig::default()).await;
        assert_eq!(controller.state(), CaptureState::Idle);
        assert_eq!(client.measurements_closed(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_is_fatal() {
        let result = CaptureController::connect(
            MockCaptureClient::with_config(MockConfig {
                fail_connect: true,
                ..Default::default()
            }),
            &session(),
            &capture(10.0),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_start_first_attempt() {
        let (mut controller, client) = connected(MockConfig::default()).await;
        controller.start_with_retry().await.unwrap();
        assert_eq!(controller.state(), CaptureState::Active);
        assert_eq!(client.start_attempts(), 1);
        assert_eq!(client.configured_durations(), vec![10.0]);
    }

    #[tokio::test]
    async fn test_start_retry_reconfigures() {
        let (mut controller, client) = connected(MockConfig {
            start_rejections: 1,
            ..Default::default()
        })
        .await;

        controller.start_with_retry().await.unwrap();
        assert_eq!(controller.state(), CaptureState::Active);
        assert_eq!(client.start_attempts(), 2);
        // Configuration re-applied before the retry
        assert_eq!(client.configured_durations(), vec![10.0, 10.0]);
    }

    #[tokio::test]
    async fn test_start_retry_bound_then_abort() {
        let (mut controller, client) = connected(MockConfig {
            start_rejections: 2,
            ..Default::default()
        })
        .await;

        let err = controller.start_with_retry().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::StartExhausted { attempts: 2, .. }
        ));
        assert_eq!(controller.state(), CaptureState::Aborted);
        // Exactly 2 starts total, no third attempt
        assert_eq!(client.start_attempts(), 2);
        // No trigger dispatch ever happened
        assert!(client.markers().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_timeout_is_non_fatal() {
        tokio::time::pause();
        let (mut controller, _client) = connected(MockConfig {
            suppress_started_event: true,
            ..Default::default()
        })
        .await;

        controller.start_with_retry().await.unwrap();
        let confirmed = controller.confirm_started().await.unwrap();
        assert!(!confirmed);
        assert_eq!(controller.state(), CaptureState::Active);
    }

    #[tokio::test]
    async fn test_stop_and_save_reaches_saved() {
        let (mut controller, client) = connected(MockConfig::default()).await;
        controller.start_with_retry().await.unwrap();
        controller
            .stop_and_save(Path::new("walk.qtm"))
            .await
            .unwrap();
        assert_eq!(controller.state(), CaptureState::Saved);
        assert_eq!(client.saved_to().unwrap().to_str(), Some("walk.qtm"));
    }

    #[tokio::test]
    async fn test_cleanup_always_releases_and_disconnects() {
        let (mut controller, client) = connected(MockConfig {
            start_rejections: 2,
            ..Default::default()
        })
        .await;

        let _ = controller.start_with_retry().await;
        controller.abort_cleanup().await;

        assert_eq!(controller.state(), CaptureState::Aborted);
        assert!(client.is_released());
        assert!(client.is_disconnected());
    }

    #[tokio::test]
    async fn test_cleanup_closes_saved_session() {
        let (mut controller, client) = connected(MockConfig::default()).await;
        controller.start_with_retry().await.unwrap();
        controller.stop_and_save(Path::new("out.qtm")).await.unwrap();
        controller.abort_cleanup().await;
        assert_eq!(controller.state(), CaptureState::Closed);
        assert!(client.is_disconnected());
    }

    #[tokio::test]
    async fn test_marker_sink_still_usable_through_shared_handle() {
        let (mut controller, client) = connected(MockConfig::default()).await;
        controller.start_with_retry().await.unwrap();
        client.set_marker("TaskStart").await.unwrap();
        assert_eq!(client.markers(), vec!["TaskStart"]);
    }
}
