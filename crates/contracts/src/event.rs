//! Trigger event vocabulary shared by the detector, dispatcher and lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Logical event kinds that produce a marker/pulse pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskStart,
    TaskEnd,
    RightHeelStrike,
    RightToeOff,
    LeftHeelStrike,
    LeftToeOff,
}

impl EventKind {
    /// All kinds, in trigger-code declaration order
    pub const ALL: [EventKind; 6] = [
        EventKind::TaskStart,
        EventKind::TaskEnd,
        EventKind::RightHeelStrike,
        EventKind::RightToeOff,
        EventKind::LeftHeelStrike,
        EventKind::LeftToeOff,
    ];

    /// Marker name recorded in the capture session timeline
    pub fn marker(&self) -> &'static str {
        match self {
            Self::TaskStart => "TaskStart",
            Self::TaskEnd => "TaskEnd",
            Self::RightHeelStrike => "RHS",
            Self::RightToeOff => "RTO",
            Self::LeftHeelStrike => "LHS",
            Self::LeftToeOff => "LTO",
        }
    }

    /// True for the gait events emitted by the streaming detector
    pub fn is_gait_event(&self) -> bool {
        !matches!(self, Self::TaskStart | Self::TaskEnd)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// 8-bit hardware trigger code; 0 is reserved as the idle/reset level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TriggerCode(u8);

impl TriggerCode {
    /// Create a code, rejecting the reserved idle value 0
    pub fn new(code: u8) -> Result<Self, ContractError> {
        if code == 0 {
            return Err(ContractError::config_validation(
                "trigger code",
                "0 is reserved as the idle level",
            ));
        }
        Ok(Self(code))
    }

    /// Raw byte written to the line
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for TriggerCode {
    type Error = ContractError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::new(code)
    }
}

impl From<TriggerCode> for u8 {
    fn from(code: TriggerCode) -> Self {
        code.0
    }
}

impl fmt::Display for TriggerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-event trigger code assignment
///
/// The hardware line is a single shared resource; codes must stay pairwise
/// distinct so interleaved pulses remain attributable (validated by
/// `config_loader`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerMap {
    #[serde(default = "default_task_start")]
    pub task_start: TriggerCode,
    #[serde(default = "default_task_end")]
    pub task_end: TriggerCode,
    #[serde(default = "default_rhs")]
    pub rhs: TriggerCode,
    #[serde(default = "default_rto")]
    pub rto: TriggerCode,
    #[serde(default = "default_lhs")]
    pub lhs: TriggerCode,
    #[serde(default = "default_lto")]
    pub lto: TriggerCode,
}

fn default_task_start() -> TriggerCode {
    TriggerCode(2)
}

fn default_task_end() -> TriggerCode {
    TriggerCode(3)
}

fn default_rhs() -> TriggerCode {
    TriggerCode(4)
}

fn default_rto() -> TriggerCode {
    TriggerCode(5)
}

fn default_lhs() -> TriggerCode {
    TriggerCode(6)
}

fn default_lto() -> TriggerCode {
    TriggerCode(7)
}

impl Default for TriggerMap {
    fn default() -> Self {
        Self {
            task_start: default_task_start(),
            task_end: default_task_end(),
            rhs: default_rhs(),
            rto: default_rto(),
            lhs: default_lhs(),
            lto: default_lto(),
        }
    }
}

impl TriggerMap {
    /// Code bound to the given event kind
    pub fn code_for(&self, kind: EventKind) -> TriggerCode {
        match kind {
            EventKind::TaskStart => self.task_start,
            EventKind::TaskEnd => self.task_end,
            EventKind::RightHeelStrike => self.rhs,
            EventKind::RightToeOff => self.rto,
            EventKind::LeftHeelStrike => self.lhs,
            EventKind::LeftToeOff => self.lto,
        }
    }

    /// All codes, in `EventKind::ALL` order
    pub fn codes(&self) -> [TriggerCode; 6] {
        [
            self.task_start,
            self.task_end,
            self.rhs,
            self.rto,
            self.lhs,
            self.lto,
        ]
    }
}

/// One marker/pulse pair, the unit the dispatcher treats as a single
/// synchronized event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Event kind; supplies the software marker name
    pub kind: EventKind,
    /// Hardware code fired on the trigger line
    pub code: TriggerCode,
}

impl DispatchRequest {
    /// Build a request for `kind` using the configured code map
    pub fn for_event(kind: EventKind, codes: &TriggerMap) -> Self {
        Self {
            kind,
            code: codes.code_for(kind),
        }
    }

    /// Software marker name for this request
    pub fn marker(&self) -> &'static str {
        self.kind.marker()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_code_rejected() {
        assert!(TriggerCode::new(0).is_err());
        assert!(TriggerCode::new(1).is_ok());
        assert!(TriggerCode::new(255).is_ok());
    }

    #[test]
    fn test_default_map_matches_event_order() {
        let map = TriggerMap::default();
        let expected = [2u8, 3, 4, 5, 6, 7];
        for (kind, want) in EventKind::ALL.iter().zip(expected) {
            assert_eq!(map.code_for(*kind).value(), want);
        }
    }

    #[test]
    fn test_request_carries_marker_name() {
        let map = TriggerMap::default();
        let req = DispatchRequest::for_event(EventKind::LeftToeOff, &map);
        assert_eq!(req.marker(), "LTO");
        assert_eq!(req.code.value(), 7);
    }

    #[test]
    fn test_code_serde_rejects_idle() {
        let err = serde_json::from_str::<TriggerCode>("0");
        assert!(err.is_err());
        let ok: TriggerCode = serde_json::from_str("42").unwrap();
        assert_eq!(ok.value(), 42);
    }
}
