//! Gap-based turn detection.
//!
//! Buffers audio from the first speech frame and commits a turn once the
//! configured silence gap follows. Durations are counted in samples, so the
//! detector is deterministic for a given frame sequence regardless of wall
//! clock. The buffer is cleared after every commit.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// Turn detection tunables.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Silence after speech that commits the turn (default 800ms).
    pub gap: Duration,
    /// Shorter turns than this are dropped (default 200ms).
    pub min_speech: Duration,
    /// Turns are force-committed at this length (default 30s).
    pub max_turn: Duration,
    /// Sample rate the durations are measured against.
    pub sample_rate: u32,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            gap: Duration::from_millis(800),
            min_speech: Duration::from_millis(200),
            max_turn: Duration::from_secs(30),
            sample_rate: 16000,
        }
    }
}

/// A committed turn: buffered PCM from speech start until the gap.
#[derive(Debug, Clone)]
pub struct CommandTurn {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Quiet,
    Voicing,
    Gap,
}

/// Feeds on per-frame VAD verdicts; yields a [`CommandTurn`] when one commits.
pub struct TurnDetector {
    config: TurnConfig,
    phase: Phase,
    buffer: Vec<f32>,
    silent_samples: usize,
}

impl TurnDetector {
    pub fn new(config: TurnConfig) -> Self {
        Self {
            config,
            phase: Phase::Quiet,
            buffer: Vec::new(),
            silent_samples: 0,
        }
    }

    /// Process one frame. Returns a committed turn when the silence gap (or
    /// the max turn length) is reached.
    pub fn feed(&mut self, is_speech: bool, samples: &[f32]) -> Option<CommandTurn> {
        match (self.phase, is_speech) {
            (Phase::Quiet, true) => {
                debug!("Turns: speech started");
                self.phase = Phase::Voicing;
                self.buffer.clear();
                self.buffer.extend_from_slice(samples);
                self.silent_samples = 0;
                None
            }
            (Phase::Quiet, false) => None,
            (Phase::Voicing, true) | (Phase::Gap, true) => {
                self.phase = Phase::Voicing;
                self.silent_samples = 0;
                self.buffer.extend_from_slice(samples);
                if self.buffered() >= self.config.max_turn {
                    debug!("Turns: max length reached, committing");
                    return self.commit();
                }
                None
            }
            (Phase::Voicing, false) => {
                self.phase = Phase::Gap;
                self.silent_samples = samples.len();
                None
            }
            (Phase::Gap, false) => {
                self.silent_samples += samples.len();
                if self.to_duration(self.silent_samples) >= self.config.gap {
                    return self.commit();
                }
                None
            }
        }
    }

    fn commit(&mut self) -> Option<CommandTurn> {
        let duration = self.buffered();
        let samples = std::mem::take(&mut self.buffer);
        self.phase = Phase::Quiet;
        self.silent_samples = 0;
        if duration < self.config.min_speech {
            debug!("Turns: {}ms of speech too short, dropped", duration.as_millis());
            return None;
        }
        debug!(
            "Turns: committed {}ms ({} samples)",
            duration.as_millis(),
            samples.len()
        );
        Some(CommandTurn {
            samples,
            sample_rate: self.config.sample_rate,
            duration,
            finished_at: Utc::now(),
        })
    }

    fn buffered(&self) -> Duration {
        self.to_duration(self.buffer.len())
    }

    fn to_duration(&self, samples: usize) -> Duration {
        Duration::from_secs_f64(samples as f64 / self.config.sample_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: usize = 480; // 30ms at 16kHz

    fn detector(gap_ms: u64, min_speech_ms: u64) -> TurnDetector {
        TurnDetector::new(TurnConfig {
            gap: Duration::from_millis(gap_ms),
            min_speech: Duration::from_millis(min_speech_ms),
            max_turn: Duration::from_secs(30),
            sample_rate: 16000,
        })
    }

    fn frame() -> Vec<f32> {
        vec![0.1; FRAME]
    }

    #[test]
    fn commits_after_gap() {
        let mut d = detector(90, 60);
        // 3 speech frames (90ms), then silence.
        for _ in 0..3 {
            assert!(d.feed(true, &frame()).is_none());
        }
        assert!(d.feed(false, &frame()).is_none()); // 30ms of gap
        assert!(d.feed(false, &frame()).is_none()); // 60ms
        let turn = d.feed(false, &frame()).expect("90ms gap commits"); // 90ms
        assert_eq!(turn.samples.len(), 3 * FRAME);
        assert_eq!(turn.sample_rate, 16000);
        assert_eq!(turn.duration, Duration::from_millis(90));
    }

    #[test]
    fn short_speech_is_dropped() {
        let mut d = detector(90, 60);
        d.feed(true, &frame()); // only 30ms of speech
        d.feed(false, &frame());
        d.feed(false, &frame());
        assert!(d.feed(false, &frame()).is_none());
        // Detector is reusable after a drop.
        for _ in 0..3 {
            d.feed(true, &frame());
        }
        for _ in 0..2 {
            d.feed(false, &frame());
        }
        assert!(d.feed(false, &frame()).is_some());
    }

    #[test]
    fn resumed_speech_resets_the_gap() {
        let mut d = detector(90, 60);
        for _ in 0..3 {
            d.feed(true, &frame());
        }
        d.feed(false, &frame());
        d.feed(false, &frame());
        // Speech resumes before the gap elapses; buffer keeps growing.
        assert!(d.feed(true, &frame()).is_none());
        for _ in 0..2 {
            d.feed(false, &frame());
        }
        let turn = d.feed(false, &frame()).unwrap();
        assert_eq!(turn.samples.len(), 4 * FRAME);
    }

    #[test]
    fn silence_alone_never_commits() {
        let mut d = detector(90, 60);
        for _ in 0..50 {
            assert!(d.feed(false, &frame()).is_none());
        }
    }
}
