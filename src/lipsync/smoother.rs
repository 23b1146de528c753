//! Asymmetric attack/release easing of mouth openness.

use crate::params::SmootherTuning;

/// Target openness for one frame.
///
/// While speaking the target never drops below the active floor; when silent
/// it is 0.
pub fn openness_target(raw_loudness: f32, speech_active: bool, tuning: &SmootherTuning) -> f32 {
    if speech_active {
        raw_loudness.clamp(0.0, 1.0).max(tuning.active_floor)
    } else {
        0.0
    }
}

/// Persistent openness state, stepped once per frame
#[derive(Debug, Clone, Default)]
pub struct OpennessSmoother {
    openness: f32,
    tuning: SmootherTuning,
}

impl OpennessSmoother {
    pub fn new(tuning: SmootherTuning) -> Self {
        Self {
            openness: 0.0,
            tuning,
        }
    }

    /// Current openness in [0, 1]
    pub fn openness(&self) -> f32 {
        self.openness
    }

    /// Advance one frame toward the target derived from `raw_loudness`
    pub fn step(&mut self, raw_loudness: f32, speech_active: bool) -> f32 {
        let target = openness_target(raw_loudness, speech_active, &self.tuning);

        // Attack vs release is decided against the current value every frame
        let rate = if target > self.openness {
            self.tuning.attack_rate
        } else {
            self.tuning.release_rate
        };

        self.openness += (target - self.openness) * rate;

        if target == 0.0 && self.openness < self.tuning.rest_epsilon {
            self.openness = 0.0;
        }
        self.openness = self.openness.clamp(0.0, 1.0);

        self.openness
    }

    /// Snap back to closed (used when a new model is bound)
    pub fn reset(&mut self) {
        self.openness = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames_until(
        smoother: &mut OpennessSmoother,
        raw: f32,
        active: bool,
        done: impl Fn(f32) -> bool,
    ) -> usize {
        let mut frames = 0;
        while !done(smoother.openness()) {
            smoother.step(raw, active);
            frames += 1;
            assert!(frames < 10_000, "smoother never converged");
        }
        frames
    }

    #[test]
    fn test_floor_while_active() {
        let tuning = SmootherTuning::default();
        assert_eq!(openness_target(0.0, true, &tuning), 0.06);
        assert_eq!(openness_target(0.5, true, &tuning), 0.5);
        assert_eq!(openness_target(0.9, false, &tuning), 0.0);
    }

    #[test]
    fn test_single_step_rates() {
        let mut smoother = OpennessSmoother::default();
        assert!((smoother.step(1.0, true) - 0.55).abs() < 1e-6);

        // Target 0.06 is below 0.55: release rate applies
        let expected = 0.55 + (0.06 - 0.55) * 0.10;
        assert!((smoother.step(0.0, true) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_attack_faster_than_release() {
        let mut smoother = OpennessSmoother::default();
        let attack = frames_until(&mut smoother, 1.0, true, |o| o >= 0.9);

        let release = frames_until(&mut smoother, 0.0, false, |o| o <= 0.1);

        assert!(attack < release, "attack {} vs release {}", attack, release);
        assert_eq!(attack, 3);
    }

    #[test]
    fn test_relaxes_to_exact_zero() {
        let mut smoother = OpennessSmoother::default();
        for _ in 0..10 {
            smoother.step(1.0, true);
        }

        let mut previous = smoother.openness();
        for _ in 0..500 {
            let next = smoother.step(0.0, false);
            assert!(next <= previous);
            if previous > 0.0 {
                assert!(next < previous);
            }
            previous = next;
        }
        assert_eq!(smoother.openness(), 0.0);
        assert_eq!(smoother.step(0.0, false), 0.0);
    }

    #[test]
    fn test_settles_on_floor_not_zero() {
        let mut smoother = OpennessSmoother::default();
        smoother.step(1.0, true);
        for _ in 0..300 {
            smoother.step(0.0, true);
        }
        assert!((smoother.openness() - 0.06).abs() < 1e-3);
    }

    #[test]
    fn test_out_of_range_loudness_clamped() {
        let mut smoother = OpennessSmoother::default();
        for _ in 0..100 {
            smoother.step(7.0, true);
        }
        assert!(smoother.openness() <= 1.0);
    }
}
