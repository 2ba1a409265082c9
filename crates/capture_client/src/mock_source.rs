//! Mock sample source
//!
//! Implements `SampleSource` with a synthetic alternating step waveform,
//! produced on a background thread. Used for development without a capture
//! system and for integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::{PlateMapping, Sample, SampleBatch, SampleBatchCallback, SampleSource};
use tracing::debug;

/// Synthetic gait waveform parameters
///
/// Per step cycle the front plate loads at phase 0.0 and unloads at 0.45,
/// the back plate loads at 0.25 and unloads at 0.70: one heel-strike and
/// one toe-off per cycle.
#[derive(Debug, Clone)]
pub struct MockGaitProfile {
    /// Batch delivery rate (batches per second)
    pub batch_rate_hz: f64,
    /// Analog sampling rate within the waveform
    pub sample_rate_hz: f64,
    /// Step cycle period in seconds
    pub step_period_sec: f64,
    /// Loaded-plate force magnitude (N)
    pub magnitude: f64,
    /// Channels carried per sample
    pub channel_count: usize,
    /// Where the plates live in the channel space
    pub plates: PlateMapping,
}

impl Default for MockGaitProfile {
    fn default() -> Self {
        Self {
            batch_rate_hz: 20.0,
            sample_rate_hz: 100.0,
            step_period_sec: 1.0,
            magnitude: 100.0,
            channel_count: 9,
            plates: PlateMapping::default(),
        }
    }
}

impl MockGaitProfile {
    fn sample_at(&self, index: u64) -> Sample {
        let t = index as f64 / self.sample_rate_hz;
        let phase = (t % self.step_period_sec) / self.step_period_sec;

        let front = if phase < 0.45 { self.magnitude } else { 0.0 };
        let back = if (0.25..0.70).contains(&phase) {
            self.magnitude
        } else {
            0.0
        };

        let width = self
            .channel_count
            .max(self.plates.front_channel + 1)
            .max(self.plates.back_channel + 1);
        let mut channels = vec![0.0; width];
        channels[self.plates.front_channel] = front;
        channels[self.plates.back_channel] = back;
        Sample::new(channels)
    }
}

/// Mock gait sample source
///
/// Generates batches at the configured rate on a background thread and hands
/// them to the registered callback, matching the transport's delivery model.
pub struct MockGaitSource {
    profile: MockGaitProfile,
    listening: Arc<AtomicBool>,
}

impl MockGaitSource {
    pub fn new(profile: MockGaitProfile) -> Self {
        Self {
            profile,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SampleSource for MockGaitSource {
    fn source_id(&self) -> &str {
        "mock_gait"
    }

    fn listen(&self, callback: SampleBatchCallback) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let profile = self.profile.clone();
        let listening = Arc::clone(&self.listening);
        let interval = Duration::from_secs_f64(1.0 / profile.batch_rate_hz);
        let samples_per_batch =
            ((profile.sample_rate_hz / profile.batch_rate_hz).round() as usize).max(1);

        thread::spawn(move || {
            let mut next_index: u64 = 0;
            let mut frame_id: u64 = 0;

            debug!(
                batch_rate_hz = profile.batch_rate_hz,
                samples_per_batch, "mock gait source started"
            );

            while listening.load(Ordering::Relaxed) {
                frame_id += 1;
                let timestamp = next_index as f64 / profile.sample_rate_hz;
                let samples: Vec<Sample> = (0..samples_per_batch)
                    .map(|offset| profile.sample_at(next_index + offset as u64))
                    .collect();
                next_index += samples_per_batch as u64;

                callback(SampleBatch::new(timestamp, Some(frame_id), samples));
                thread::sleep(interval);
            }

            debug!("mock gait source stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::Mutex;

    #[test]
    fn test_waveform_has_one_strike_per_cycle() {
        let profile = MockGaitProfile::default();
        let threshold = 20.0;
        let mut front_rises = 0;
        let mut back_falls = 0;
        let mut prev_front = false;
        let mut prev_back = false;

        // Two full cycles at 100 Hz
        for index in 0..200u64 {
            let sample = profile.sample_at(index);
            let front = sample.channel(profile.plates.front_channel).unwrap() >= threshold;
            let back = sample.channel(profile.plates.back_channel).unwrap() >= threshold;
            if front && !prev_front {
                front_rises += 1;
            }
            if !back && prev_back {
                back_falls += 1;
            }
            prev_front = front;
            prev_back = back;
        }

        assert_eq!(front_rises, 2);
        assert_eq!(back_falls, 2);
    }

    #[test]
    fn test_source_delivers_batches() {
        let source = MockGaitSource::new(MockGaitProfile {
            batch_rate_hz: 100.0,
            ..Default::default()
        });

        let batches = Arc::new(AtomicU64::new(0));
        let samples = Arc::new(Mutex::new(Vec::new()));
        let batches_clone = Arc::clone(&batches);
        let samples_clone = Arc::clone(&samples);

        source.listen(Arc::new(move |batch| {
            batches_clone.fetch_add(1, Ordering::Relaxed);
            samples_clone.lock().unwrap().extend_from_slice(batch.samples());
        }));

        thread::sleep(Duration::from_millis(100));
        source.stop();

        assert!(batches.load(Ordering::Relaxed) > 0);
        assert!(!source.is_listening());
        let samples = samples.lock().unwrap();
        assert!(samples.iter().all(|s| s.channel_count() >= 9));
    }

    #[test]
    fn test_listen_idempotent() {
        let source = MockGaitSource::new(MockGaitProfile::default());
        let count = Arc::new(AtomicU64::new(0));

        let count1 = Arc::clone(&count);
        source.listen(Arc::new(move |_| {
            count1.fetch_add(1, Ordering::Relaxed);
        }));

        // Second callback must not register
        let count2 = Arc::clone(&count);
        source.listen(Arc::new(move |_| {
            count2.fetch_add(1000, Ordering::Relaxed);
        }));

        thread::sleep(Duration::from_millis(120));
        source.stop();

        let total = count.load(Ordering::Relaxed);
        assert!(total > 0);
        assert!(total < 1000);
    }
}
