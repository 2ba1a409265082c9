//! MarkerSink trait - the software half of a dispatch

use std::sync::Arc;

use crate::ContractError;

/// Software marker output trait
///
/// Implemented by session clients; the dispatcher drives it concurrently
/// with the hardware pulse.
#[trait_variant::make(MarkerSink: Send)]
pub trait LocalMarkerSink {
    /// Record a named event in the capture session timeline
    async fn set_marker(&self, name: &str) -> Result<(), ContractError>;
}

impl<T: MarkerSink + Send + Sync> MarkerSink for Arc<T> {
    async fn set_marker(&self, name: &str) -> Result<(), ContractError> {
        (**self).set_marker(name).await
    }
}
