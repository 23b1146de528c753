//! Parameter definitions with units and documented semantics.
//!
//! All tuned numbers live here with:
//! - Units (Hz, radians, frames, milliseconds, etc.)
//! - Documented ranges and meanings
//! - Validation where a bad value would break the frame loop

mod audio;
mod lipsync;
mod render;

// Re-export all types
pub use audio::{AnalyserConfig, ConversationConfig, SyntheticSpeechConfig};
pub use lipsync::{
    EnergyTuning, LipSyncTuning, PoseTuning, RhythmComponent, RhythmTuning, SmootherTuning,
};
pub use render::{RecordingConfig, RenderConfig};
