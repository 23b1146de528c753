//! Character side of the pipeline: parameter models, the demo face and the
//! per-frame stage that drives them.

mod face;
mod model;
mod stage;

pub use face::{mouth_height, FaceModel, RigPreset, Vertex, FACE_VERTEX_COUNT};
pub use model::{ParameterDef, ParameterModel, ParameterSet};
pub use stage::{FrameListener, FrameTime, Stage};
