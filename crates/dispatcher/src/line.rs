//! Trigger line implementations
//!
//! `SerialTriggerLine` drives a serial device; `NullTriggerLine` is the
//! degrade stub used when no hardware is configured or the device cannot be
//! opened, so higher layers never special-case missing hardware.

use std::io::Write;
use std::time::Duration;

use contracts::{ContractError, TriggerLine};
use serialport::SerialPort;
use tracing::{error, info};

/// Open timeout for the serial device
const OPEN_TIMEOUT: Duration = Duration::from_millis(1000);

/// Serial trigger line
pub struct SerialTriggerLine {
    port: Box<dyn SerialPort>,
    descriptor: String,
}

impl SerialTriggerLine {
    /// Open `device` at `baud`
    pub fn open(device: &str, baud: u32) -> Result<Self, ContractError> {
        let port = serialport::new(device, baud)
            .timeout(OPEN_TIMEOUT)
            .open()
            .map_err(|e| ContractError::hardware(device, format!("open failed: {e}")))?;

        Ok(Self {
            port,
            descriptor: format!("{device} @ {baud}"),
        })
    }
}

impl TriggerLine for SerialTriggerLine {
    fn describe(&self) -> &str {
        &self.descriptor
    }

    fn set_level(&mut self, level: u8) -> Result<(), ContractError> {
        self.port
            .write_all(&[level])
            .and_then(|_| self.port.flush())
            .map_err(|e| {
                ContractError::hardware(&self.descriptor, format!("write failed: {e}"))
            })
    }
}

/// No-op trigger line
///
/// Satisfies the timing contract without touching hardware; pulses still
/// hold for the configured width so dispatch timing stays comparable.
#[derive(Debug, Default)]
pub struct NullTriggerLine;

impl TriggerLine for NullTriggerLine {
    fn describe(&self) -> &str {
        "null"
    }

    fn set_level(&mut self, _level: u8) -> Result<(), ContractError> {
        Ok(())
    }
}

/// Open the configured trigger line, degrading to the null stub on failure
///
/// Every degrade is surfaced through tracing and the
/// `triggersync_hardware_faults` counter before the stub takes over.
pub fn open_line(enabled: bool, device: &str, baud: u32) -> Box<dyn TriggerLine> {
    if !enabled {
        info!("hardware triggers disabled, using null line");
        return Box::new(NullTriggerLine);
    }

    match SerialTriggerLine::open(device, baud) {
        Ok(line) => {
            info!(device = %line.describe(), "trigger line opened");
            Box::new(line)
        }
        Err(e) => {
            observability::record_hardware_fault();
            error!(device = %device, error = %e, "trigger line unavailable, degrading to null line");
            Box::new(NullTriggerLine)
        }
    }
}

/// Test double recording every level written to the line
#[derive(Debug, Default)]
pub struct RecordingLine {
    levels: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
}

impl RecordingLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the written levels
    pub fn levels(&self) -> std::sync::Arc<std::sync::Mutex<Vec<u8>>> {
        std::sync::Arc::clone(&self.levels)
    }

    /// Codes observed between idle resets, in write order
    pub fn codes(&self) -> Vec<u8> {
        self.levels
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|&l| l != 0)
            .collect()
    }
}

impl TriggerLine for RecordingLine {
    fn describe(&self) -> &str {
        "recording"
    }

    fn set_level(&mut self, level: u8) -> Result<(), ContractError> {
        self.levels.lock().unwrap().push(level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_line_accepts_any_level() {
        let mut line = NullTriggerLine;
        assert!(line.set_level(0).is_ok());
        assert!(line.set_level(255).is_ok());
        assert_eq!(line.describe(), "null");
    }

    #[test]
    fn test_open_line_disabled_is_null() {
        let line = open_line(false, "/dev/ttyUSB0", 115_200);
        assert_eq!(line.describe(), "null");
    }

    #[test]
    fn test_open_line_degrades_on_missing_device() {
        let line = open_line(true, "/dev/does-not-exist-triggersync", 115_200);
        assert_eq!(line.describe(), "null");
    }

    #[test]
    fn test_recording_line_tracks_levels() {
        let mut line = RecordingLine::new();
        line.set_level(4).unwrap();
        line.set_level(0).unwrap();
        line.set_level(5).unwrap();
        line.set_level(0).unwrap();
        assert_eq!(line.codes(), vec![4, 5]);
    }
}
