//! TriggerLine trait - the hardware output boundary
//!
//! A line holds an 8-bit level; 0 is the idle/reset value. Writes are
//! blocking at the device level and must run on the blocking pool, never on
//! a thread that services sample batches or session protocol I/O.

use crate::ContractError;

/// Pulse-output device abstraction
pub trait TriggerLine: Send {
    /// Device description for logging ("/dev/ttyUSB0 @ 115200", "null")
    fn describe(&self) -> &str;

    /// Drive the line to `level`
    fn set_level(&mut self, level: u8) -> Result<(), ContractError>;
}
