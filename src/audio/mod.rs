//! Audio collaborators: spectrum analysis, clip playback and the
//! sample-less speech stand-in.

mod analyser;
mod playback;
mod synthetic;

pub use analyser::{AnalyserTap, SpectrumAnalyser};
pub use playback::{ClipCursor, SpeechClip, SpeechPlayer};
pub use synthetic::SyntheticSpeech;
