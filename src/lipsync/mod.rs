//! Audio-to-parameter lip-sync driver.
//!
//! Turns live spectral energy (or, without samples, a synthetic talking
//! rhythm) into eased mouth openness, form and brow values, and writes them
//! onto a model's named parameters once per render frame.

mod context;
mod driver;
mod energy;
mod resolver;
mod rhythm;
mod smoother;

// Re-export public types
pub use context::{SharedEnergySource, SpeechContext, SpeechSnapshot};
pub use driver::{DriveMode, DriverListener, LoudnessInput, MouthDriver};
pub use energy::{spectrum_loudness, EnergyExtractor, EnergySource};
pub use resolver::{Binding, ControlTable, FaceControl, MouthPose, ParameterResolver};
pub use rhythm::{synthetic_loudness, RhythmClock};
pub use smoother::{openness_target, OpennessSmoother};
