//! # Dispatcher
//!
//! Emits a software marker and a hardware pulse as one synchronized event.
//! The hardware half runs on a bounded worker pool over a single trigger
//! line; the software half goes through the session's `MarkerSink`. Two
//! entry points exist: awaited dispatch for the task start/end pair and
//! fire-and-forget dispatch for streamed gait events.

mod dispatch;
mod error;
mod line;
mod metrics;
mod pulse;

pub use dispatch::{DispatchOutcome, DispatcherHandle, TriggerDispatcher};
pub use error::DispatcherError;
pub use line::{open_line, NullTriggerLine, RecordingLine, SerialTriggerLine};
pub use metrics::{PulseMetrics, PulseMetricsSnapshot};
pub use pulse::{PulseChannel, PulseChannelConfig};
