//! Dispatcher error types

use contracts::EventKind;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// The dispatcher worker task is gone
    #[error("dispatcher worker stopped")]
    WorkerStopped,

    /// Fire-and-forget queue full; the event was dropped
    #[error("dispatch queue full, {kind} dropped")]
    QueueFull { kind: EventKind },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}
