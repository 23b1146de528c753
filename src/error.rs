//! Error types for collaborator setup (audio devices, WAV decoding, GPU).
//!
//! The per-frame lip-sync path never fails; these only surface while wiring
//! up playback and rendering.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LipwaveError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Audio
    #[error("No audio output device found")]
    NoOutputDevice,

    #[error("Failed to get audio config: {0}")]
    OutputConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Unsupported output sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("WAV decoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("WAV file contains no samples")]
    EmptyClip,

    // Rendering
    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("Failed to find suitable GPU adapter")]
    NoAdapter,

    #[error("Failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LipwaveError>;
