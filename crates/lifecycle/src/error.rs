//! Lifecycle error types

use capture_client::CaptureClientError;
use thiserror::Error;

/// Lifecycle-specific errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The bounded start retry was exhausted; the session is aborted
    #[error("could not start capture after {attempts} attempts: {last}")]
    StartExhausted {
        attempts: u32,
        #[source]
        last: CaptureClientError,
    },

    /// A client operation failed fatally
    #[error(transparent)]
    Client(#[from] CaptureClientError),
}
