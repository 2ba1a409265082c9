//! RecordingPlan - Config Loader output
//!
//! Describes one complete recording: session endpoint, capture timing,
//! hardware trigger routing, gait detection parameters.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{PlateMapping, TriggerMap};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete recording configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingPlan {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Session collaborator endpoint
    #[serde(default)]
    pub session: SessionConfig,

    /// Capture timing
    pub capture: CaptureConfig,

    /// Hardware trigger routing
    #[serde(default)]
    pub triggers: TriggerConfig,

    /// Online gait detection
    #[serde(default)]
    pub gait: GaitConfig,
}

/// Session collaborator endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Host running the capture software
    #[serde(default = "default_host")]
    pub host: String,

    /// RT protocol port
    #[serde(default = "default_port")]
    pub port: u16,

    /// RT protocol version negotiated at connect
    #[serde(default = "default_rt_version")]
    pub rt_version: String,

    /// Master-control password; empty when the server requires none
    #[serde(default)]
    pub password: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    22223
}

fn default_rt_version() -> String {
    "1.22".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            rt_version: default_rt_version(),
            password: String::new(),
        }
    }
}

/// Capture timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Capture duration in seconds; must be > 0
    pub duration_sec: f64,

    /// Bounded wait for start/stop confirmation events
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_sec: f64,

    /// How long before the end of the capture window the end pair fires
    #[serde(default = "default_end_lead")]
    pub end_lead_sec: f64,

    /// Where the session file is saved; the CLI derives a subject/task name
    /// when absent
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_confirm_timeout() -> f64 {
    5.0
}

fn default_end_lead() -> f64 {
    0.5
}

/// Hardware trigger routing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// When false, the dispatcher runs marker-only over a null line
    #[serde(default)]
    pub enabled: bool,

    /// Serial device path (e.g. "/dev/ttyUSB0", "COM6")
    #[serde(default = "default_device")]
    pub device: String,

    /// Serial baud rate
    #[serde(default = "default_baud")]
    pub baud: u32,

    /// Pulse hold time in milliseconds
    #[serde(default = "default_pulse_ms")]
    pub pulse_ms: u64,

    /// Pulse worker pool size; 1 serializes pulse ordering
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pulse queue capacity shared by both dispatch paths
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Per-event trigger codes
    #[serde(default)]
    pub codes: TriggerMap,
}

fn default_device() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud() -> u32 {
    115_200
}

fn default_pulse_ms() -> u64 {
    10
}

fn default_workers() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    32
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            device: default_device(),
            baud: default_baud(),
            pulse_ms: default_pulse_ms(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            codes: TriggerMap::default(),
        }
    }
}

/// Online gait detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaitConfig {
    /// When true, the detector is registered on the sample stream
    #[serde(default)]
    pub enabled: bool,

    /// Force threshold in newtons; `>=` counts as plate contact
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Channel-to-plate assignment
    #[serde(default)]
    pub plates: PlateMapping,

    /// Side assigned to the first heel-strike; alternates strictly afterwards
    #[serde(default = "default_first_strike_is_right")]
    pub first_strike_is_right: bool,
}

fn default_threshold() -> f64 {
    20.0
}

fn default_first_strike_is_right() -> bool {
    true
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: default_threshold(),
            plates: PlateMapping::default(),
            first_strike_is_right: default_first_strike_is_right(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_plan_json() {
        let plan: RecordingPlan =
            serde_json::from_str(r#"{ "capture": { "duration_sec": 10.0 } }"#).unwrap();
        assert_eq!(plan.session.port, 22223);
        assert_eq!(plan.capture.duration_sec, 10.0);
        assert_eq!(plan.capture.confirm_timeout_sec, 5.0);
        assert_eq!(plan.capture.end_lead_sec, 0.5);
        assert!(!plan.triggers.enabled);
        assert!(!plan.gait.enabled);
        assert_eq!(plan.gait.plates.front_channel, 2);
        assert_eq!(plan.gait.plates.back_channel, 8);
    }

    #[test]
    fn test_trigger_defaults_match_legacy_codes() {
        let cfg = TriggerConfig::default();
        assert_eq!(cfg.codes.task_start.value(), 2);
        assert_eq!(cfg.codes.lto.value(), 7);
        assert_eq!(cfg.baud, 115_200);
        assert_eq!(cfg.pulse_ms, 10);
    }
}
