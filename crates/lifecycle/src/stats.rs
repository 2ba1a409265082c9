//! Recording statistics

use std::path::PathBuf;
use std::time::Duration;

use contracts::CaptureState;
use gait_detector::DetectorReport;
use ingestion::MetricsSnapshot;
use observability::TallySummary;

/// Statistics from one recording run
#[derive(Debug, Clone)]
pub struct RecordingStats {
    /// Wall-clock duration of the whole run
    pub duration: Duration,

    /// Lifecycle state after cleanup
    pub final_state: CaptureState,

    /// Whether the start confirmation arrived within the bounded wait
    pub start_confirmed: bool,

    /// Where the session was saved
    pub saved_to: Option<PathBuf>,

    /// Dispatched marker/pulse pairs
    pub events: TallySummary,

    /// Gait detector report, when detection was enabled
    pub detector: Option<DetectorReport>,

    /// Sample stream metrics, when detection was enabled
    pub stream: Option<MetricsSnapshot>,
}

impl Default for RecordingStats {
    fn default() -> Self {
        Self {
            duration: Duration::ZERO,
            final_state: CaptureState::Idle,
            start_confirmed: false,
            saved_to: None,
            events: TallySummary::default(),
            detector: None,
            stream: None,
        }
    }
}

impl RecordingStats {
    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════╗");
        println!("║             Recording Statistics             ║");
        println!("╚══════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Final state: {}", self.final_state);
        println!(
            "   ├─ Start confirmed: {}",
            if self.start_confirmed { "yes" } else { "no (proceeded)" }
        );
        match &self.saved_to {
            Some(path) => println!("   └─ Saved to: {}", path.display()),
            None => println!("   └─ Saved to: (not saved)"),
        }

        println!("\nDispatched events ({} total)", self.events.total);
        for (marker, count) in &self.events.per_event {
            println!("   ├─ {marker}: {count}");
        }
        println!("   └─ Incomplete pairs: {}", self.events.incomplete);

        if let Some(detector) = &self.detector {
            println!("\nGait detection");
            println!("   ├─ Batches processed: {}", detector.batches);
            println!("   ├─ Heel-strikes: {}", detector.heel_strikes);
            println!("   ├─ Toe-offs: {}", detector.toe_offs);
            println!("   ├─ Stream faults: {}", detector.stream_faults);
            println!("   └─ Dropped dispatches: {}", detector.dropped_dispatches);
        }

        if let Some(stream) = &self.stream {
            println!("\nSample stream");
            println!("   ├─ Batches received: {}", stream.batches_received);
            println!("   ├─ Samples received: {}", stream.samples_received);
            println!("   └─ Batches dropped: {}", stream.batches_dropped);
        }

        println!();
    }
}
