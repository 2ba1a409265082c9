//! Explicit detector state
//!
//! Latches and alternation live in owned structs with reset semantics tied
//! to stream (re)start, instead of closure-captured mutables.

use contracts::EventKind;

/// Per-channel threshold-crossing latch
///
/// Holds the last computed on/off state of each plate; updated
/// unconditionally after every sample so each rising/falling transition is
/// seen at most once. Persists across batches for the life of a streaming
/// session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeState {
    pub front_on: bool,
    pub back_on: bool,
}

impl EdgeState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Body side assigned to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn heel_strike(self) -> EventKind {
        match self {
            Self::Right => EventKind::RightHeelStrike,
            Self::Left => EventKind::LeftHeelStrike,
        }
    }

    pub fn toe_off(self) -> EventKind {
        match self {
            Self::Right => EventKind::RightToeOff,
            Self::Left => EventKind::LeftToeOff,
        }
    }
}

/// Strike counter plus the configured first side
///
/// Sides alternate strictly from the configured first side. Toe-off has no
/// counter of its own: its side always mirrors the side implied by the
/// front-plate strike counter at that moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlternationState {
    strike_count: u64,
    first_strike_is_right: bool,
}

impl AlternationState {
    pub fn new(first_strike_is_right: bool) -> Self {
        Self {
            strike_count: 0,
            first_strike_is_right,
        }
    }

    /// Count one heel-strike and return its side
    pub fn record_strike(&mut self) -> Side {
        self.strike_count += 1;
        self.current_side()
    }

    /// Side implied by the current strike counter
    ///
    /// With zero strikes recorded this is the opposite of the configured
    /// first side, matching the alternation rule applied to an even count.
    pub fn current_side(&self) -> Side {
        let odd = self.strike_count % 2 == 1;
        if odd == self.first_strike_is_right {
            Side::Right
        } else {
            Side::Left
        }
    }

    pub fn strike_count(&self) -> u64 {
        self.strike_count
    }

    pub fn reset(&mut self) {
        self.strike_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternation_starts_from_configured_side() {
        let mut alt = AlternationState::new(true);
        assert_eq!(alt.record_strike(), Side::Right);
        assert_eq!(alt.record_strike(), Side::Left);
        assert_eq!(alt.record_strike(), Side::Right);

        let mut alt = AlternationState::new(false);
        assert_eq!(alt.record_strike(), Side::Left);
        assert_eq!(alt.record_strike(), Side::Right);
    }

    #[test]
    fn test_current_side_does_not_advance() {
        let mut alt = AlternationState::new(true);
        alt.record_strike();
        assert_eq!(alt.current_side(), Side::Right);
        assert_eq!(alt.current_side(), Side::Right);
        assert_eq!(alt.strike_count(), 1);
    }

    #[test]
    fn test_reset_restores_initial_side() {
        let mut alt = AlternationState::new(true);
        alt.record_strike();
        alt.record_strike();
        alt.reset();
        assert_eq!(alt.record_strike(), Side::Right);
    }
}
