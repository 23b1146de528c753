//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

use crate::avatar::RigPreset;
use crate::error::Result;
use crate::params::RecordingConfig;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "lipwave")]
#[command(about = "Talking-avatar demo: speech audio drives a face's mouth", long_about = None)]
pub struct Args {
    /// WAV file played as the reply (synthetic speech when absent)
    #[arg(long, value_name = "PATH")]
    pub speech_wav: Option<PathBuf>,

    /// Parameter naming scheme of the face: cubism3 (default), cubism2, minimal
    #[arg(long, value_name = "NAME", default_value = "cubism3")]
    pub rig: String,

    /// Reply text (sets the synthetic utterance length)
    #[arg(long, value_name = "TEXT")]
    pub reply: Option<String>,

    /// Record frames to PNG (duration in seconds)
    #[arg(long, value_name = "SECONDS")]
    pub record: Option<f32>,

    /// Run headless for N frames, logging mouth openness per frame
    #[arg(long, value_name = "N")]
    pub trace_frames: Option<usize>,

    /// Frame rate for headless tracing and recording
    #[arg(long, value_name = "FPS", default_value = "60")]
    pub fps: u32,
}

impl Args {
    /// Parse rig preset from command-line arguments
    pub fn parse_rig(&self) -> RigPreset {
        RigPreset::from_name(&self.rig).unwrap_or_else(|| {
            warn!("Unknown rig '{}', using cubism3", self.rig);
            RigPreset::default()
        })
    }

    /// Create recording configuration if recording mode is enabled
    pub fn create_recording_config(&self) -> Result<Option<RecordingConfig>> {
        let Some(duration) = self.record else {
            return Ok(None);
        };

        let mut config = RecordingConfig::new(duration);
        config.fps = self.fps.max(1);

        std::fs::create_dir_all(config.frames_dir())?;
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["lipwave"]);
        assert_eq!(args.parse_rig(), RigPreset::Cubism3);
        assert_eq!(args.fps, 60);
        assert!(args.speech_wav.is_none());
        assert!(args.create_recording_config().unwrap().is_none());
    }

    #[test]
    fn test_headless_flags() {
        let args = Args::parse_from([
            "lipwave",
            "--rig",
            "Cubism2",
            "--trace-frames",
            "120",
            "--fps",
            "30",
            "--reply",
            "hello there",
        ]);
        assert_eq!(args.parse_rig(), RigPreset::Cubism2);
        assert_eq!(args.trace_frames, Some(120));
        assert_eq!(args.fps, 30);
        assert_eq!(args.reply.as_deref(), Some("hello there"));
    }

    #[test]
    fn test_unknown_rig_falls_back() {
        let args = Args::parse_from(["lipwave", "--rig", "live2d-9"]);
        assert_eq!(args.parse_rig(), RigPreset::Cubism3);
    }
}
