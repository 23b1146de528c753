//! Audio analysis and speech stand-in configuration.

use std::time::Duration;

use crate::error::{LipwaveError, Result};

/// Spectrum analyser configuration (browser analyser-node semantics)
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// FFT window size (power of 2, 32..=32768)
    pub fft_size: usize,

    /// Exponential smoothing between successive reads (0 = none, <1)
    /// Browser default: 0.8
    pub smoothing_time_constant: f32,

    /// Magnitude mapped to byte 0 (dBFS)
    /// Browser default: -100
    pub min_decibels: f32,

    /// Magnitude mapped to byte 255 (dBFS)
    /// Browser default: -30
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins exposed to readers
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(LipwaveError::InvalidConfig(format!(
                "FFT size must be a power of 2 in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing_time_constant) {
            return Err(LipwaveError::InvalidConfig(format!(
                "smoothing time constant must be in [0, 1), got {}",
                self.smoothing_time_constant
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(LipwaveError::InvalidConfig(format!(
                "min decibels ({}) must be below max decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }
}

/// Timing of the sample-less synthetic speech engine
#[derive(Debug, Clone)]
pub struct SyntheticSpeechConfig {
    /// Speaking time per character of text (milliseconds)
    /// Roughly 14 characters per second of conversational speech
    pub ms_per_char: u64,

    /// Shortest utterance (milliseconds)
    pub min_duration_ms: u64,

    /// Poll interval of the background timer (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for SyntheticSpeechConfig {
    fn default() -> Self {
        Self {
            ms_per_char: 70,
            min_duration_ms: 600,
            poll_interval_ms: 10,
        }
    }
}

impl SyntheticSpeechConfig {
    /// Estimated speaking time for `text`
    pub fn estimate_duration(&self, text: &str) -> Duration {
        let chars = text.trim().chars().count() as u64;
        Duration::from_millis((chars * self.ms_per_char).max(self.min_duration_ms))
    }
}

/// Conversation pacing (from the assistant UI)
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Pause between a reply request and the reply starting (milliseconds)
    /// Assistant UI value: 1200
    pub thinking_delay_ms: u64,

    /// Reply text spoken when no other text is given
    pub default_reply: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            thinking_delay_ms: 1200,
            default_reply: "Hello! I'm your AI assistant. Press space to talk with me.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_analyser_config_is_valid() {
        let config = AnalyserConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frequency_bin_count(), 128);
    }

    #[test]
    fn test_analyser_rejects_bad_fft_size() {
        let config = AnalyserConfig {
            fft_size: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AnalyserConfig {
            fft_size: 16,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_analyser_rejects_inverted_decibel_range() {
        let config = AnalyserConfig {
            min_decibels: -30.0,
            max_decibels: -100.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_synthetic_duration_estimate() {
        let config = SyntheticSpeechConfig::default();
        assert_eq!(
            config.estimate_duration(""),
            Duration::from_millis(config.min_duration_ms)
        );
        assert_eq!(
            config.estimate_duration("a".repeat(100).as_str()),
            Duration::from_millis(100 * config.ms_per_char)
        );
    }
}
