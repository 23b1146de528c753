//! Speech clip playback on the default output device.
//!
//! Playback is the real-audio regime: the output callback feeds an analyser
//! tap, and the analyser is attached to the speech context as the energy
//! source for the duration of the clip.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, warn};

use super::analyser::{AnalyserTap, SpectrumAnalyser};
use crate::error::{LipwaveError, Result};
use crate::lipsync::{SharedEnergySource, SpeechContext};
use crate::params::AnalyserConfig;

/// Decoded mono speech audio
#[derive(Debug, Clone)]
pub struct SpeechClip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SpeechClip {
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(LipwaveError::EmptyClip);
        }
        if sample_rate == 0 {
            return Err(LipwaveError::InvalidConfig("sample rate must be positive".into()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Decode a WAV file, mixing every channel down to mono
    pub fn from_wav(path: impl AsRef<Path>) -> Result<Self> {
        let reader = hound::WavReader::open(path.as_ref())?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: std::io::Read>(mut reader: hound::WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let channels = spec.channels.max(1) as usize;
        let mono = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        Self::from_samples(mono, spec.sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Linear-interpolating read head converting a clip to the device rate
#[derive(Debug)]
pub struct ClipCursor {
    clip: Arc<SpeechClip>,
    position: f64,
    step: f64,
}

impl ClipCursor {
    pub fn new(clip: Arc<SpeechClip>, output_rate: u32) -> Self {
        let step = clip.sample_rate as f64 / output_rate.max(1) as f64;
        Self {
            clip,
            position: 0.0,
            step,
        }
    }

    /// Next output-rate sample, or `None` once the clip is exhausted
    pub fn next_sample(&mut self) -> Option<f32> {
        let samples = &self.clip.samples;
        let index = self.position as usize;
        if index >= samples.len() {
            return None;
        }

        let frac = (self.position - index as f64) as f32;
        let current = samples[index];
        let next = samples.get(index + 1).copied().unwrap_or(current);
        self.position += self.step;
        Some(current + (next - current) * frac)
    }

    pub fn is_done(&self) -> bool {
        self.position as usize >= self.clip.samples.len()
    }
}

/// Releases the speech context exactly once per playback
struct PlaybackEnd {
    ctx: SpeechContext,
    source: SharedEnergySource,
    tap: AnalyserTap,
    done: AtomicBool,
}

impl PlaybackEnd {
    fn finish(&self) -> bool {
        if self.done.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.tap.finish();
        self.ctx.finish_source(&self.source);
        true
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

struct ActivePlayback {
    _stream: cpal::Stream,
    end: Arc<PlaybackEnd>,
}

/// Plays speech clips and publishes their spectrum to the speech context
pub struct SpeechPlayer {
    ctx: SpeechContext,
    analyser_config: AnalyserConfig,
    active: Option<ActivePlayback>,
}

impl SpeechPlayer {
    pub fn new(ctx: SpeechContext, analyser_config: AnalyserConfig) -> Result<Self> {
        analyser_config.validate()?;
        Ok(Self {
            ctx,
            analyser_config,
            active: None,
        })
    }

    /// Start playing `clip` at frame time `now`, replacing any current playback.
    ///
    /// The analyser is attached before speech is marked active, so the first
    /// driven frame already sees the source.
    pub fn play(&mut self, clip: Arc<SpeechClip>, now: Instant) -> Result<()> {
        self.stop();

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(LipwaveError::NoOutputDevice)?;
        let config = device.default_output_config()?;
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(LipwaveError::UnsupportedSampleFormat(format!(
                "{:?}",
                config.sample_format()
            )));
        }

        let channels = config.channels().max(1) as usize;
        let output_rate = config.sample_rate().0;
        info!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            output_rate,
            clip_secs = clip.duration_secs(),
            "Starting speech playback"
        );

        let analyser = Arc::new(SpectrumAnalyser::new(self.analyser_config.clone())?);
        let tap = analyser.tap();
        let source: SharedEnergySource = analyser;
        let end = Arc::new(PlaybackEnd {
            ctx: self.ctx.clone(),
            source: Arc::clone(&source),
            tap: tap.clone(),
            done: AtomicBool::new(false),
        });

        let mut cursor = ClipCursor::new(clip, output_rate);
        let mut mono = Vec::new();
        let end_data = Arc::clone(&end);
        let end_err = Arc::clone(&end);

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                mono.clear();
                for frame in data.chunks_mut(channels) {
                    let sample = cursor.next_sample().unwrap_or(0.0);
                    frame.fill(sample);
                    mono.push(sample);
                }
                tap.push(&mono);

                if cursor.is_done() && end_data.finish() {
                    info!("Speech playback finished");
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                end_err.finish();
            },
            None,
        )?;

        self.ctx.set_energy_source(Some(source));
        self.ctx.set_speech_active_at(true, now);

        if let Err(e) = stream.play() {
            end.finish();
            return Err(e.into());
        }

        self.active = Some(ActivePlayback {
            _stream: stream,
            end,
        });
        Ok(())
    }

    /// Interrupt playback, releasing the context if this player still owns it
    pub fn stop(&mut self) {
        if let Some(playback) = self.active.take() {
            if playback.end.finish() {
                warn!("Speech playback interrupted");
            }
        }
    }

    /// Drop a finished stream; returns whether a clip is still playing
    pub fn poll(&mut self) -> bool {
        if self.active.as_ref().is_some_and(|p| p.end.is_done()) {
            self.active = None;
        }
        self.active.is_some()
    }
}

impl Drop for SpeechPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
