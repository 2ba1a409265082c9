//! Domain metric recorders and the run-level event tally

use std::collections::BTreeMap;

use contracts::EventKind;
use metrics::counter;

/// Record one classified gait event
pub fn record_gait_event(kind: EventKind) {
    counter!("triggersync_gait_events", "kind" => kind.marker()).increment(1);
}

/// Record one dispatch with its per-half results
pub fn record_dispatch(kind: EventKind, marker_ok: bool, pulse_ok: bool) {
    counter!(
        "triggersync_dispatches",
        "kind" => kind.marker(),
        "complete" => if marker_ok && pulse_ok { "true" } else { "false" },
    )
    .increment(1);
    if !marker_ok {
        counter!("triggersync_marker_failures", "kind" => kind.marker()).increment(1);
    }
    if !pulse_ok {
        counter!("triggersync_pulse_failures", "kind" => kind.marker()).increment(1);
    }
}

/// Record one received sample batch
pub fn record_batch_received(samples: usize) {
    counter!("triggersync_batches_received").increment(1);
    counter!("triggersync_samples_received").increment(samples as u64);
}

/// Record a skipped/malformed batch
pub fn record_stream_fault() {
    counter!("triggersync_stream_faults").increment(1);
}

/// Record a hardware fault surfaced by the pulse path
pub fn record_hardware_fault() {
    counter!("triggersync_hardware_faults").increment(1);
}

/// Run-level tally of dispatched events, kept locally for the final summary
#[derive(Debug, Clone, Default)]
pub struct EventTally {
    counts: BTreeMap<&'static str, u64>,
    incomplete: u64,
}

impl EventTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one dispatch outcome
    pub fn record(&mut self, kind: EventKind, complete: bool) {
        *self.counts.entry(kind.marker()).or_insert(0) += 1;
        if !complete {
            self.incomplete += 1;
        }
    }

    /// Count of a specific event kind
    pub fn count(&self, kind: EventKind) -> u64 {
        self.counts.get(kind.marker()).copied().unwrap_or(0)
    }

    pub fn summary(&self) -> TallySummary {
        TallySummary {
            per_event: self.counts.iter().map(|(k, v)| (*k, *v)).collect(),
            total: self.counts.values().sum(),
            incomplete: self.incomplete,
        }
    }
}

/// Flattened tally for reporting
#[derive(Debug, Clone, Default)]
pub struct TallySummary {
    /// (marker name, count) pairs in name order
    pub per_event: Vec<(&'static str, u64)>,
    pub total: u64,
    pub incomplete: u64,
}

impl TallySummary {
    /// Count recorded under the given marker name
    pub fn count_of(&self, marker: &str) -> u64 {
        self.per_event
            .iter()
            .find(|(name, _)| *name == marker)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}
