//! Capture client error types

use contracts::{ContractError, SessionEvent};
use thiserror::Error;

/// Capture client specific error
#[derive(Debug, Error)]
pub enum CaptureClientError {
    /// Cannot reach the session collaborator; fatal
    #[error("failed to connect to capture host: {message}")]
    ConnectionFailed { message: String },

    /// Master control refused
    #[error("master control denied: {message}")]
    ControlDenied { message: String },

    /// Start rejected by the collaborator; recoverable within the retry bound
    #[error("capture start rejected: {message}")]
    StartRejected { message: String },

    /// A protocol command returned an error reply
    #[error("command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Bounded wait for a confirmation event elapsed
    #[error("timed out after {waited_ms}ms waiting for {event}")]
    EventTimeout { event: SessionEvent, waited_ms: u64 },

    /// Malformed wire traffic
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureClientError {
    /// Create connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create start rejection
    pub fn start_rejected(message: impl Into<String>) -> Self {
        Self::StartRejected {
            message: message.into(),
        }
    }

    /// Create command failure
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// True for start failures the lifecycle may retry
    pub fn is_recoverable_start(&self) -> bool {
        matches!(self, Self::StartRejected { .. })
    }

    /// True for confirmation timeouts, which are non-fatal at confirm sites
    pub fn is_event_timeout(&self) -> bool {
        matches!(self, Self::EventTimeout { .. })
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, CaptureClientError>;
