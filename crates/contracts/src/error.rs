//! Layered error definitions
//!
//! Categorized by source: config / session / hardware / stream

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Session Errors =====
    /// Cannot reach the session collaborator; fatal before any hardware interaction
    #[error("session connection error: {message}")]
    Connection { message: String },

    /// Bounded wait for a session confirmation elapsed; non-fatal at confirm sites
    #[error("timed out after {waited_ms}ms waiting for {event}")]
    EventTimeout { event: String, waited_ms: u64 },

    // ===== Hardware Errors =====
    /// Pulse device unreachable or write failed; isolated per dispatch
    #[error("hardware fault on '{device}': {message}")]
    Hardware { device: String, message: String },

    // ===== Stream Errors =====
    /// Malformed or missing sample batch; skipped, processing continues
    #[error("stream fault: {message}")]
    Stream { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create session connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create event timeout error
    pub fn event_timeout(event: impl Into<String>, waited_ms: u64) -> Self {
        Self::EventTimeout {
            event: event.into(),
            waited_ms,
        }
    }

    /// Create hardware fault
    pub fn hardware(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hardware {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Create stream fault
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// True for conditions that log a warning and let execution continue
    pub fn is_non_fatal(&self) -> bool {
        matches!(
            self,
            Self::EventTimeout { .. } | Self::Hardware { .. } | Self::Stream { .. }
        )
    }
}
