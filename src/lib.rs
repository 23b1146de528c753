//! lipwave library - audio-driven lip-sync for a talking avatar

pub mod audio;
pub mod avatar;
pub mod cli;
pub mod error;
pub mod lipsync;
pub mod params;
pub mod rendering;
pub mod session;
