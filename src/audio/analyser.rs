//! Byte-scale spectrum analyser fed from the playback callback.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::Result;
use crate::lipsync::EnergySource;
use crate::params::AnalyserConfig;

/// Sample history shared between the audio thread and readers
struct SampleRing {
    samples: Mutex<VecDeque<f32>>,
    capacity: usize,
    finished: AtomicBool,
}

/// Write end of an analyser, owned by the audio callback
#[derive(Clone)]
pub struct AnalyserTap {
    ring: Arc<SampleRing>,
}

impl AnalyserTap {
    /// Append mono samples, keeping only the most recent window
    pub fn push(&self, samples: &[f32]) {
        let mut ring = self.ring.samples.lock();
        for &sample in samples {
            if ring.len() == self.ring.capacity {
                ring.pop_front();
            }
            ring.push_back(sample);
        }
    }

    /// Mark the signal as gone; readers get no bins from now on
    pub fn finish(&self) {
        self.ring.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.ring.finished.load(Ordering::Acquire)
    }
}

/// FFT state touched only by readers
struct AnalysisState {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

/// Spectrum analyser with analyser-node semantics.
///
/// Each read windows the latest `fft_size` samples, runs a forward FFT,
/// smooths magnitudes over time and maps decibels onto 0-255.
pub struct SpectrumAnalyser {
    config: AnalyserConfig,
    ring: Arc<SampleRing>,
    state: Mutex<AnalysisState>,
}

impl SpectrumAnalyser {
    pub fn new(config: AnalyserConfig) -> Result<Self> {
        config.validate()?;

        let size = config.fft_size;
        let mut planner = FftPlanner::new();
        let state = AnalysisState {
            fft: planner.plan_fft_forward(size),
            window: (0..size).map(|i| hann_window(i, size)).collect(),
            buffer: vec![Complex::new(0.0, 0.0); size],
            smoothed: vec![0.0; config.frequency_bin_count()],
        };

        Ok(Self {
            ring: Arc::new(SampleRing {
                samples: Mutex::new(VecDeque::with_capacity(size)),
                capacity: size,
                finished: AtomicBool::new(false),
            }),
            state: Mutex::new(state),
            config,
        })
    }

    /// Handle for the producer side
    pub fn tap(&self) -> AnalyserTap {
        AnalyserTap {
            ring: Arc::clone(&self.ring),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.ring.finished.load(Ordering::Acquire)
    }

    fn magnitude_to_byte(&self, magnitude: f32) -> u8 {
        if magnitude <= 0.0 {
            return 0;
        }
        let db = 20.0 * magnitude.log10();
        let range = self.config.max_decibels - self.config.min_decibels;
        let scaled = 255.0 / range * (db - self.config.min_decibels);
        scaled.clamp(0.0, 255.0) as u8
    }
}

impl EnergySource for SpectrumAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.config.frequency_bin_count()
    }

    fn read_byte_frequency_data(&self, bins: &mut [u8]) -> usize {
        if self.is_finished() {
            return 0;
        }

        let size = self.config.fft_size;
        let mut state = self.state.lock();
        let AnalysisState {
            fft,
            window,
            buffer,
            smoothed,
        } = &mut *state;

        {
            // Right-align recent samples; a short history is zero-padded in front
            let ring = self.ring.samples.lock();
            let pad = size - ring.len();
            for (i, slot) in buffer.iter_mut().enumerate() {
                let sample = if i < pad { 0.0 } else { ring[i - pad] };
                *slot = Complex::new(sample * window[i], 0.0);
            }
        }

        fft.process(buffer);

        let tau = self.config.smoothing_time_constant;
        let count = bins.len().min(smoothed.len());
        for k in 0..smoothed.len() {
            let magnitude = buffer[k].norm() / size as f32;
            smoothed[k] = tau * smoothed[k] + (1.0 - tau) * magnitude;
        }
        for (bin, &magnitude) in bins.iter_mut().zip(smoothed.iter()) {
            *bin = self.magnitude_to_byte(magnitude);
        }
        count
    }
}

/// Hann window function for FFT analysis
fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}
