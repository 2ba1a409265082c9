//! # Capture Client
//!
//! The session-collaborator boundary: a `CaptureClient` trait abstracting
//! the motion-capture RT protocol, the real TCP implementation, and mock
//! implementations for tests and hardware-free runs.

mod client;
mod error;
mod mock_client;
mod mock_source;
mod qtm;
mod wire;

pub use client::CaptureClient;
pub use error::{CaptureClientError, Result};
pub use mock_client::{MockCaptureClient, MockConfig};
pub use mock_source::{MockGaitProfile, MockGaitSource};
pub use qtm::QtmClient;
