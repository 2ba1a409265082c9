//! SampleSource trait - sample stream abstraction
//!
//! Defines a unified interface for sample-batch producers, decoupling the
//! ingestion path from concrete transports. Real protocol streams and mock
//! generators implement the same surface.

use std::sync::Arc;

use crate::SampleBatch;

/// Sample delivery callback type
///
/// When the source produces a batch, it hands it over through this callback.
/// Uses `Arc` to allow callback sharing across contexts.
pub type SampleBatchCallback = Arc<dyn Fn(SampleBatch) + Send + Sync>;

/// Sample stream trait
///
/// # Design Principles
///
/// 1. **Decoupling**: separates batch production from batch consumption
/// 2. **Unified Interface**: mock and real streams use the same API
/// 3. **Callback Pattern**: callbacks rather than channels, matching the
///    transport's native delivery model
pub trait SampleSource: Send + Sync {
    /// Stable identifier for logging
    fn source_id(&self) -> &str;

    /// Register the delivery callback and start producing batches
    ///
    /// Repeated calls while already listening are idempotent (the first
    /// callback stays registered).
    fn listen(&self, callback: SampleBatchCallback);

    /// Stop delivery
    ///
    /// Severs local delivery synchronously; any protocol-level stream is
    /// torn down by the owning client.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
