//! Capture lifecycle vocabulary

use std::fmt;

/// Lifecycle states of a recording session
///
/// `Aborted` is terminal and reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Configuring,
    Starting,
    Active,
    Streaming,
    Stopping,
    Saved,
    Closed,
    Aborted,
}

impl CaptureState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Aborted)
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Streaming => "streaming",
            Self::Stopping => "stopping",
            Self::Saved => "saved",
            Self::Closed => "closed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Confirmation events emitted by the session collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    Connected,
    ConnectionClosed,
    CaptureStarted,
    CaptureStopped,
    CalibrationStarted,
    CalibrationStopped,
    WaitingForTrigger,
    CaptureSaved,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connected => "Connected",
            Self::ConnectionClosed => "ConnectionClosed",
            Self::CaptureStarted => "CaptureStarted",
            Self::CaptureStopped => "CaptureStopped",
            Self::CalibrationStarted => "CalibrationStarted",
            Self::CalibrationStopped => "CalibrationStopped",
            Self::WaitingForTrigger => "WaitingForTrigger",
            Self::CaptureSaved => "CaptureSaved",
        };
        f.write_str(name)
    }
}
