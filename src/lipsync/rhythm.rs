//! Synthetic talking rhythm for speech without accessible samples.

use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use crate::params::RhythmTuning;

/// Loudness of the synthetic rhythm `elapsed_s` seconds into an utterance.
///
/// Sum of rectified sines at incommensurate frequencies, scaled and clamped
/// to [0, 1]. Negative times are treated as 0.
pub fn synthetic_loudness(elapsed_s: f32, tuning: &RhythmTuning) -> f32 {
    let t = elapsed_s.max(0.0);

    let sum: f32 = tuning
        .components
        .iter()
        .map(|c| c.amplitude * (TAU * c.frequency_hz * t + c.phase_rad).sin().abs())
        .sum();

    (sum * tuning.output_scale).clamp(0.0, 1.0)
}

/// Start time of the current sample-less utterance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RhythmClock {
    started: Option<Instant>,
}

impl RhythmClock {
    /// Capture `now` unless already running; returns the start time
    pub fn start_if_unset(&mut self, now: Instant) -> Instant {
        *self.started.get_or_insert(now)
    }

    pub fn reset(&mut self) {
        self.started = None;
    }

    pub fn started(&self) -> Option<Instant> {
        self.started
    }

    /// Time since start, or `None` while unset
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started.map(|start| now.saturating_duration_since(start))
    }
}
