//! Capture client abstraction
//!
//! Defines the trait for driving the motion-capture session collaborator,
//! supporting the real RT protocol implementation and mock testing.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use contracts::{MarkerSink, SampleSource, SessionEvent};

use crate::error::Result;

/// Capture client trait
///
/// Abstracts the session collaborator's operations for testing and future
/// implementation replacement. The `MarkerSink` supertrait carries the
/// software half of a dispatch, so the dispatcher never sees the full
/// protocol surface.
pub trait CaptureClient: MarkerSink + Send + Sync {
    /// Connect to the capture host and negotiate the protocol version
    fn connect(&mut self, host: &str, port: u16) -> impl Future<Output = Result<()>> + Send;

    /// Take master control of the session
    fn take_control(&self, password: &str) -> impl Future<Output = Result<()>> + Send;

    /// Close any open measurement
    ///
    /// Used by the best-effort "clear previous session" step; callers log
    /// and continue on failure.
    fn close_measurement(&self) -> impl Future<Output = Result<()>> + Send;

    /// Push the capture-duration configuration
    ///
    /// The payload is a duration-only structured document whose
    /// serialization is owned by the implementation. Must complete before
    /// `start` is attempted.
    fn configure(&self, duration: Duration) -> impl Future<Output = Result<()>> + Send;

    /// Request capture start
    ///
    /// A rejection surfaces as `StartRejected` so the lifecycle can apply
    /// its bounded retry.
    fn start(&self) -> impl Future<Output = Result<()>> + Send;

    /// Wait for a session confirmation event up to `timeout`
    fn await_event(
        &self,
        event: SessionEvent,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Begin streaming analog sample batches
    ///
    /// Returns a source usable by the ingestion pipeline; delivery starts
    /// once a callback is registered via `SampleSource::listen`.
    fn stream_samples(&self) -> impl Future<Output = Result<Box<dyn SampleSource>>> + Send;

    /// Request capture stop
    fn stop(&self) -> impl Future<Output = Result<()>> + Send;

    /// Persist the capture to `path`, overwriting any existing file
    fn save(&self, path: &Path) -> impl Future<Output = Result<()>> + Send;

    /// Release master control
    fn release_control(&self) -> impl Future<Output = Result<()>> + Send;

    /// Tear down the connection; idempotent
    fn disconnect(&self) -> impl Future<Output = Result<()>> + Send;
}
