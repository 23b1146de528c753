//! Lip-sync tuning: energy curve, synthetic rhythm, smoothing and pose shaping.

use crate::error::{LipwaveError, Result};

/// Energy extraction curve applied to the byte-scale spectrum
#[derive(Debug, Clone)]
pub struct EnergyTuning {
    /// Full-spectrum RMS that counts as "normal speech" (0-255 magnitude scale)
    /// Tuned value: 35
    pub typical_speech_rms: f32,

    /// Gain applied after squaring the normalized RMS
    /// Tuned value: 1.5
    /// Formula: loudness = min(1, (rms / typical)^2 * gain)
    pub curve_gain: f32,
}

impl Default for EnergyTuning {
    fn default() -> Self {
        Self {
            typical_speech_rms: 35.0,
            curve_gain: 1.5,
        }
    }
}

/// One rectified sine in the synthetic rhythm
#[derive(Debug, Clone, Copy)]
pub struct RhythmComponent {
    /// Frequency (Hz)
    pub frequency_hz: f32,

    /// Phase offset (radians)
    pub phase_rad: f32,

    /// Weight in the sum (dimensionless)
    pub amplitude: f32,
}

/// Synthetic speech rhythm used when no samples are available
#[derive(Debug, Clone)]
pub struct RhythmTuning {
    /// Summed components, lowest frequency first
    pub components: Vec<RhythmComponent>,

    /// Scale applied to the sum before clamping to 1
    /// Tuned value: 0.68
    pub output_scale: f32,
}

impl Default for RhythmTuning {
    fn default() -> Self {
        Self {
            components: vec![
                // Syllable pulse
                RhythmComponent {
                    frequency_hz: 4.2,
                    phase_rad: 0.0,
                    amplitude: 1.0,
                },
                // Flutter
                RhythmComponent {
                    frequency_hz: 9.1,
                    phase_rad: 0.9,
                    amplitude: 0.45,
                },
                // Jitter
                RhythmComponent {
                    frequency_hz: 16.3,
                    phase_rad: 1.8,
                    amplitude: 0.2,
                },
            ],
            output_scale: 0.68,
        }
    }
}

/// Asymmetric per-frame smoothing of mouth openness
#[derive(Debug, Clone)]
pub struct SmootherTuning {
    /// Lerp rate per frame when the target is above the current value
    /// Tuned value: 0.55
    pub attack_rate: f32,

    /// Lerp rate per frame when the target is at or below the current value
    /// Tuned value: 0.10
    pub release_rate: f32,

    /// Minimum target while speech is active (keeps the lips parted between syllables)
    /// Tuned value: 0.06
    pub active_floor: f32,

    /// Openness below this snaps to exactly 0 when relaxing to a zero target
    pub rest_epsilon: f32,
}

impl Default for SmootherTuning {
    fn default() -> Self {
        Self {
            attack_rate: 0.55,
            release_rate: 0.10,
            active_floor: 0.06,
            rest_epsilon: 1e-4,
        }
    }
}

/// Derivation of form and brow values from openness
#[derive(Debug, Clone)]
pub struct PoseTuning {
    /// Above this openness the form is fully "open" (0)
    /// Tuned value: 0.5
    pub open_form_threshold: f32,

    /// Slope of the smile bias at low openness
    /// Tuned value: 1.5
    /// Formula: form = max(0, 1 - openness * slope)
    pub smile_slope: f32,

    /// Brow raise per unit openness
    /// Tuned value: 0.3
    pub brow_scale: f32,
}

impl Default for PoseTuning {
    fn default() -> Self {
        Self {
            open_form_threshold: 0.5,
            smile_slope: 1.5,
            brow_scale: 0.3,
        }
    }
}

/// All lip-sync tuning in one place
#[derive(Debug, Clone, Default)]
pub struct LipSyncTuning {
    pub energy: EnergyTuning,
    pub rhythm: RhythmTuning,
    pub smoother: SmootherTuning,
    pub pose: PoseTuning,
}

impl LipSyncTuning {
    /// Validate tuning (rates in (0, 1], positive normalizer, etc.)
    pub fn validate(&self) -> Result<()> {
        if self.energy.typical_speech_rms <= 0.0 {
            return Err(LipwaveError::InvalidConfig(format!(
                "typical speech RMS must be > 0, got {}",
                self.energy.typical_speech_rms
            )));
        }

        let s = &self.smoother;
        for (name, rate) in [("attack", s.attack_rate), ("release", s.release_rate)] {
            if !(rate > 0.0 && rate <= 1.0) {
                return Err(LipwaveError::InvalidConfig(format!(
                    "{} rate must be in (0, 1], got {}",
                    name, rate
                )));
            }
        }
        if !(0.0..1.0).contains(&s.active_floor) {
            return Err(LipwaveError::InvalidConfig(format!(
                "active floor must be in [0, 1), got {}",
                s.active_floor
            )));
        }

        if self.rhythm.components.is_empty() {
            return Err(LipwaveError::InvalidConfig(
                "rhythm needs at least one component".to_string(),
            ));
        }
        if self
            .rhythm
            .components
            .iter()
            .any(|c| c.frequency_hz <= 0.0 || c.amplitude < 0.0)
        {
            return Err(LipwaveError::InvalidConfig(
                "rhythm components need positive frequency and non-negative amplitude"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning_is_valid() {
        assert!(LipSyncTuning::default().validate().is_ok());
    }

    #[test]
    fn test_attack_outpaces_release_by_default() {
        let s = SmootherTuning::default();
        assert!(s.attack_rate > s.release_rate);
    }

    #[test]
    fn test_rejects_out_of_range_rate() {
        let mut tuning = LipSyncTuning::default();
        tuning.smoother.release_rate = 0.0;
        assert!(tuning.validate().is_err());

        let mut tuning = LipSyncTuning::default();
        tuning.smoother.attack_rate = 1.5;
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_rhythm_lowest_component_first() {
        let rhythm = RhythmTuning::default();
        let lowest = rhythm
            .components
            .iter()
            .map(|c| c.frequency_hz)
            .fold(f32::INFINITY, f32::min);
        assert_eq!(rhythm.components[0].frequency_hz, lowest);
        assert!((lowest - 4.2).abs() < 1e-6);
    }
}
