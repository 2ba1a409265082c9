//! SampleBatch - the ingestion payload
//!
//! Analog channel readings as delivered by the session collaborator, one
//! batch per network packet.

use serde::{Deserialize, Serialize};

/// One instant of analog channel readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    channels: Vec<f64>,
}

impl Sample {
    pub fn new(channels: Vec<f64>) -> Self {
        Self { channels }
    }

    /// Indexed channel access; `None` when the transport delivered fewer channels
    pub fn channel(&self, index: usize) -> Option<f64> {
        self.channels.get(index).copied()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl From<Vec<f64>> for Sample {
    fn from(channels: Vec<f64>) -> Self {
        Self::new(channels)
    }
}

/// Ordered sequence of samples, delivered atomically per network packet
///
/// Order within a batch is arrival order and is preserved through processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBatch {
    /// Session clock timestamp of the batch (seconds)
    pub timestamp: f64,

    /// Protocol frame number, when the transport provides one
    pub frame_id: Option<u64>,

    samples: Vec<Sample>,
}

impl SampleBatch {
    pub fn new(timestamp: f64, frame_id: Option<u64>, samples: Vec<Sample>) -> Self {
        Self {
            timestamp,
            frame_id,
            samples,
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Channel-to-plate assignment; supplied as configuration, never discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateMapping {
    /// 0-based analog channel carrying the front plate vertical force
    pub front_channel: usize,

    /// 0-based analog channel carrying the back plate vertical force
    pub back_channel: usize,
}

impl Default for PlateMapping {
    fn default() -> Self {
        Self {
            front_channel: 2,
            back_channel: 8,
        }
    }
}
