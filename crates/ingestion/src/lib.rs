//! # Ingestion
//!
//! The sample-delivery path: bridges a `SampleSource` callback into a
//! bounded channel the detector task drains in arrival order.

mod adapter;
mod config;
mod stream;

pub use adapter::BatchAdapter;
pub use config::{BackpressureConfig, DropPolicy, MetricsSnapshot, StreamMetrics};
pub use stream::SampleStream;
