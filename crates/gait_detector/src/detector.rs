//! Streaming gait-event classifier
//!
//! Per-sample, in arrival order: a front-plate rising edge is a heel-strike,
//! a back-plate falling edge is a toe-off. The threshold comparison is
//! inclusive (`>=` counts as on) and debouncing is purely latch-based: no
//! hysteresis band, each transition fires at most once.

use contracts::{ContractError, EventKind, GaitConfig, PlateMapping, SampleBatch};

use crate::state::{AlternationState, EdgeState};

/// Detector parameters
#[derive(Debug, Clone, Copy)]
pub struct GaitDetectorConfig {
    /// Force threshold in newtons
    pub threshold: f64,
    /// Channel-to-plate assignment
    pub plates: PlateMapping,
    /// Side of the first heel-strike
    pub first_strike_is_right: bool,
}

impl From<&GaitConfig> for GaitDetectorConfig {
    fn from(config: &GaitConfig) -> Self {
        Self {
            threshold: config.threshold,
            plates: config.plates,
            first_strike_is_right: config.first_strike_is_right,
        }
    }
}

/// One classified event and where in the batch it occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedEvent {
    pub kind: EventKind,
    pub sample_index: usize,
}

/// The streaming classifier
///
/// Owns its latch and alternation state; `reset` is called whenever
/// streaming (re)starts, so no state survives a session restart.
pub struct GaitEventDetector {
    config: GaitDetectorConfig,
    edges: EdgeState,
    alternation: AlternationState,
}

impl GaitEventDetector {
    pub fn new(config: GaitDetectorConfig) -> Self {
        Self {
            config,
            edges: EdgeState::default(),
            alternation: AlternationState::new(config.first_strike_is_right),
        }
    }

    /// Clear latches and the strike counter
    pub fn reset(&mut self) {
        self.edges.reset();
        self.alternation.reset();
    }

    /// Heel-strikes counted since the last reset
    pub fn strike_count(&self) -> u64 {
        self.alternation.strike_count()
    }

    /// Classify one batch, in arrival order
    ///
    /// An empty batch is a no-op. A sample missing a mapped channel aborts
    /// the batch with a stream fault; the caller skips it and continues.
    pub fn process_batch(
        &mut self,
        batch: &SampleBatch,
    ) -> Result<Vec<DetectedEvent>, ContractError> {
        let mut events = Vec::new();

        for (sample_index, sample) in batch.samples().iter().enumerate() {
            let front_value = sample.channel(self.config.plates.front_channel);
            let back_value = sample.channel(self.config.plates.back_channel);
            let (Some(front_value), Some(back_value)) = (front_value, back_value) else {
                return Err(ContractError::stream(format!(
                    "sample {sample_index} carries {} channels, plate mapping needs {}",
                    sample.channel_count(),
                    self.config.plates.front_channel.max(self.config.plates.back_channel) + 1,
                )));
            };

            // Front plate rising edge: heel-strike, advances the counter
            let front_on = front_value >= self.config.threshold;
            if front_on && !self.edges.front_on {
                let side = self.alternation.record_strike();
                events.push(DetectedEvent {
                    kind: side.heel_strike(),
                    sample_index,
                });
            }

            // Back plate falling edge: toe-off, side mirrors the counter
            let back_on = back_value >= self.config.threshold;
            if !back_on && self.edges.back_on {
                let side = self.alternation.current_side();
                events.push(DetectedEvent {
                    kind: side.toe_off(),
                    sample_index,
                });
            }

            // Latches update unconditionally, event or not
            self.edges.front_on = front_on;
            self.edges.back_on = back_on;
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Sample;

    fn config() -> GaitDetectorConfig {
        GaitDetectorConfig {
            threshold: 20.0,
            plates: PlateMapping {
                front_channel: 0,
                back_channel: 1,
            },
            first_strike_is_right: true,
        }
    }

    fn batch(front: &[f64], back: &[f64]) -> SampleBatch {
        let samples = front
            .iter()
            .zip(back)
            .map(|(f, b)| Sample::new(vec![*f, *b]))
            .collect();
        SampleBatch::new(0.0, None, samples)
    }

    #[test]
    fn test_reference_scenario() {
        // threshold=20, front [10,25,25,10], back [10,10,30,15], first side right:
        // one RHS at sample 1, one RTO at sample 3, nothing else
        let mut detector = GaitEventDetector::new(config());
        let events = detector
            .process_batch(&batch(&[10.0, 25.0, 25.0, 10.0], &[10.0, 10.0, 30.0, 15.0]))
            .unwrap();

        assert_eq!(
            events,
            vec![
                DetectedEvent {
                    kind: EventKind::RightHeelStrike,
                    sample_index: 1
                },
                DetectedEvent {
                    kind: EventKind::RightToeOff,
                    sample_index: 3
                },
            ]
        );
    }

    #[test]
    fn test_no_event_on_consecutive_on_samples() {
        let mut detector = GaitEventDetector::new(config());
        let events = detector
            .process_batch(&batch(&[25.0, 25.0, 25.0], &[0.0, 0.0, 0.0]))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sample_index, 0);
    }

    #[test]
    fn test_latch_persists_across_batches() {
        let mut detector = GaitEventDetector::new(config());
        let first = detector
            .process_batch(&batch(&[25.0], &[0.0]))
            .unwrap();
        assert_eq!(first.len(), 1);

        // Still on in the next batch: no new strike
        let second = detector
            .process_batch(&batch(&[25.0], &[0.0]))
            .unwrap();
        assert!(second.is_empty());

        // Off then on again: exactly one more strike, now left
        let third = detector
            .process_batch(&batch(&[10.0, 25.0], &[0.0, 0.0]))
            .unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].kind, EventKind::LeftHeelStrike);
    }

    #[test]
    fn test_toe_off_mirrors_latest_strike_side() {
        let mut detector = GaitEventDetector::new(config());

        // RHS, back loads and unloads -> RTO; LHS, back loads/unloads -> LTO
        let front = [25.0, 10.0, 10.0, 25.0, 10.0, 10.0];
        let back = [10.0, 25.0, 10.0, 10.0, 25.0, 10.0];
        let events = detector.process_batch(&batch(&front, &back)).unwrap();

        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::RightHeelStrike,
                EventKind::RightToeOff,
                EventKind::LeftHeelStrike,
                EventKind::LeftToeOff,
            ]
        );
    }

    #[test]
    fn test_threshold_comparison_is_inclusive() {
        let mut detector = GaitEventDetector::new(config());
        let events = detector
            .process_batch(&batch(&[20.0], &[0.0]))
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_toe_off_before_any_strike_is_left_when_first_is_right() {
        let mut detector = GaitEventDetector::new(config());
        let events = detector
            .process_batch(&batch(&[0.0, 0.0], &[25.0, 10.0]))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::LeftToeOff);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut detector = GaitEventDetector::new(config());
        let events = detector
            .process_batch(&SampleBatch::new(0.0, None, vec![]))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_reset_clears_all_state() {
        let mut detector = GaitEventDetector::new(config());
        detector
            .process_batch(&batch(&[25.0], &[25.0]))
            .unwrap();
        assert_eq!(detector.strike_count(), 1);

        detector.reset();
        assert_eq!(detector.strike_count(), 0);

        // Plate already loaded before reset reads as a fresh rising edge
        let events = detector
            .process_batch(&batch(&[25.0], &[0.0]))
            .unwrap();
        assert_eq!(events[0].kind, EventKind::RightHeelStrike);
    }

    #[test]
    fn test_missing_channel_is_stream_fault() {
        let mut detector = GaitEventDetector::new(GaitDetectorConfig {
            plates: PlateMapping {
                front_channel: 2,
                back_channel: 8,
            },
            ..config()
        });
        let narrow = SampleBatch::new(0.0, None, vec![Sample::new(vec![1.0, 2.0])]);
        let err = detector.process_batch(&narrow).unwrap_err();
        assert!(matches!(err, ContractError::Stream { .. }));
    }
}
