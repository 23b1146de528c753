//! Spectrum energy extraction for the real-audio regime.

use crate::params::EnergyTuning;

/// A live signal that can be read as byte-scale frequency magnitudes.
///
/// Implementations refresh the caller's buffer in place on every read, the
/// way a browser analyser node fills a `Uint8Array`.
pub trait EnergySource: Send + Sync {
    /// Number of frequency bins a full read produces
    fn frequency_bin_count(&self) -> usize;

    /// Fill `bins` with the latest magnitudes (0-255).
    ///
    /// Returns how many bins were written; 0 once the signal has gone away.
    fn read_byte_frequency_data(&self, bins: &mut [u8]) -> usize;
}

/// Reduce a byte-scale spectrum to a single loudness in [0, 1].
///
/// Full-spectrum RMS, normalized by the typical speech RMS, then squared and
/// scaled so the noise floor stays near zero while speech saturates.
pub fn spectrum_loudness(bins: &[u8], tuning: &EnergyTuning) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = bins
        .iter()
        .map(|&b| {
            let v = b as f32;
            v * v
        })
        .sum();
    let rms = (sum_sq / bins.len() as f32).sqrt();

    let normalized = (rms / tuning.typical_speech_rms).clamp(0.0, 1.0);
    (normalized * normalized * tuning.curve_gain).min(1.0)
}

/// Reads an [`EnergySource`] into a reusable buffer and measures it
#[derive(Debug, Default)]
pub struct EnergyExtractor {
    bins: Vec<u8>,
    tuning: EnergyTuning,
}

impl EnergyExtractor {
    pub fn new(tuning: EnergyTuning) -> Self {
        Self {
            bins: Vec::new(),
            tuning,
        }
    }

    /// Refresh the buffer from `source` and return its loudness
    pub fn measure(&mut self, source: &dyn EnergySource) -> f32 {
        let wanted = source.frequency_bin_count();
        if self.bins.len() != wanted {
            self.bins.resize(wanted, 0);
        }

        let written = source.read_byte_frequency_data(&mut self.bins).min(wanted);
        spectrum_loudness(&self.bins[..written], &self.tuning)
    }

    /// Most recent spectrum (for diagnostics)
    pub fn last_bins(&self) -> &[u8] {
        &self.bins
    }
}
