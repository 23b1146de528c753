//! Per-frame orchestration: pick the loudness input, smooth, apply.

use std::time::Instant;

use tracing::{debug, trace};

use super::context::{SharedEnergySource, SpeechContext, SpeechSnapshot};
use super::energy::EnergyExtractor;
use super::resolver::{ControlTable, MouthPose, ParameterResolver};
use super::rhythm::synthetic_loudness;
use super::smoother::OpennessSmoother;
use crate::avatar::{FrameListener, FrameTime, ParameterModel};
use crate::params::LipSyncTuning;

/// Where this frame's raw loudness comes from
#[derive(Clone)]
pub enum LoudnessInput {
    /// Speech inactive: relax toward closed
    Silent,
    /// Live spectrum of the playing audio
    AudioDriven(SharedEnergySource),
    /// Synthetic rhythm since the utterance started
    Synthetic { started: Instant },
}

/// Which regime a frame ran in (for logging and diagnostics)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveMode {
    #[default]
    Idle,
    AudioDriven,
    Synthetic,
}

impl LoudnessInput {
    /// Derive the input from one frame's snapshot taken at `now`.
    ///
    /// An active snapshot with no source and no clock starts its rhythm at
    /// `now`.
    pub fn from_snapshot(snapshot: SpeechSnapshot, now: Instant) -> Self {
        match (snapshot.active, snapshot.source) {
            (false, _) => LoudnessInput::Silent,
            (true, Some(source)) => LoudnessInput::AudioDriven(source),
            (true, None) => LoudnessInput::Synthetic {
                started: snapshot.rhythm_started.unwrap_or(now),
            },
        }
    }

    pub fn mode(&self) -> DriveMode {
        match self {
            LoudnessInput::Silent => DriveMode::Idle,
            LoudnessInput::AudioDriven(_) => DriveMode::AudioDriven,
            LoudnessInput::Synthetic { .. } => DriveMode::Synthetic,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, LoudnessInput::Silent)
    }
}

/// Mouth/brow animation driver for one loaded model
#[derive(Debug)]
pub struct MouthDriver {
    tuning: LipSyncTuning,
    extractor: EnergyExtractor,
    smoother: OpennessSmoother,
    resolver: ParameterResolver,
    mode: DriveMode,
    last_pose: MouthPose,
}

impl Default for MouthDriver {
    fn default() -> Self {
        Self::new(LipSyncTuning::default())
    }
}

impl MouthDriver {
    pub fn new(tuning: LipSyncTuning) -> Self {
        Self::with_table(tuning, ControlTable::default())
    }

    pub fn with_table(tuning: LipSyncTuning, table: ControlTable) -> Self {
        Self {
            extractor: EnergyExtractor::new(tuning.energy.clone()),
            smoother: OpennessSmoother::new(tuning.smoother.clone()),
            resolver: ParameterResolver::new(table),
            mode: DriveMode::Idle,
            last_pose: MouthPose::default(),
            tuning,
        }
    }

    /// Regime of the most recent frame
    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn openness(&self) -> f32 {
        self.smoother.openness()
    }

    pub fn last_pose(&self) -> MouthPose {
        self.last_pose
    }

    /// Raw loudness for `input` at `now`
    pub fn raw_loudness(&mut self, input: &LoudnessInput, now: Instant) -> f32 {
        match input {
            LoudnessInput::Silent => 0.0,
            LoudnessInput::AudioDriven(source) => self.extractor.measure(source.as_ref()),
            LoudnessInput::Synthetic { started } => {
                let elapsed = now.saturating_duration_since(*started).as_secs_f32();
                synthetic_loudness(elapsed, &self.tuning.rhythm)
            }
        }
    }

    /// Advance openness one frame without touching a model
    pub fn advance(&mut self, input: &LoudnessInput, now: Instant) -> MouthPose {
        let mode = input.mode();
        if mode != self.mode {
            debug!(from = ?self.mode, to = ?mode, "Lip-sync input changed");
            self.mode = mode;
        }

        let raw = self.raw_loudness(input, now);
        let openness = self.smoother.step(raw, input.is_active());
        self.last_pose = MouthPose::from_openness(openness, &self.tuning.pose);

        trace!(raw, openness, mode = ?mode, "Lip-sync frame");
        self.last_pose
    }

    /// Run one render frame.
    ///
    /// The input regime is re-derived from `ctx` every frame. With no model
    /// loaded nothing happens and `None` is returned.
    pub fn tick(
        &mut self,
        ctx: &SpeechContext,
        model: Option<&mut dyn ParameterModel>,
        now: Instant,
    ) -> Option<MouthPose> {
        let model = model?;

        let input = LoudnessInput::from_snapshot(ctx.frame_snapshot(now), now);
        let pose = self.advance(&input, now);
        self.resolver.apply(&pose, model);
        Some(pose)
    }

    /// Forget the model binding and close the mouth, ready for a new model
    pub fn rebind(&mut self) {
        self.resolver.unbind();
        self.smoother.reset();
        self.mode = DriveMode::Idle;
        self.last_pose = MouthPose::default();
    }

    /// Wrap into a frame listener that reads `ctx` on every tick
    pub fn into_listener(self, ctx: SpeechContext) -> DriverListener {
        DriverListener { driver: self, ctx }
    }
}

/// [`MouthDriver`] bound to its speech context for registration on a stage
#[derive(Debug)]
pub struct DriverListener {
    driver: MouthDriver,
    ctx: SpeechContext,
}

impl DriverListener {
    pub fn driver(&self) -> &MouthDriver {
        &self.driver
    }
}

impl FrameListener for DriverListener {
    fn on_frame(&mut self, frame: &FrameTime, model: &mut dyn ParameterModel) {
        self.driver.tick(&self.ctx, Some(model), frame.now);
    }
}
