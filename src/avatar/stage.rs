//! Render-loop ticker holding the loaded model and its frame listeners.

use std::time::{Duration, Instant};

use tracing::debug;

use super::model::ParameterModel;

/// Timing of one rendered frame
#[derive(Debug, Clone, Copy)]
pub struct FrameTime {
    pub now: Instant,
    /// Time since the previous tick (zero on the first)
    pub delta: Duration,
    /// Frames ticked since the model was loaded
    pub index: u64,
}

/// Callback run once per frame against the loaded model
pub trait FrameListener {
    fn on_frame(&mut self, frame: &FrameTime, model: &mut dyn ParameterModel);
}

impl<F> FrameListener for F
where
    F: FnMut(&FrameTime, &mut dyn ParameterModel),
{
    fn on_frame(&mut self, frame: &FrameTime, model: &mut dyn ParameterModel) {
        self(frame, model)
    }
}

/// Owns the current model; listeners live exactly as long as it does
pub struct Stage<M: ParameterModel> {
    model: Option<M>,
    listeners: Vec<Box<dyn FrameListener>>,
    frame_index: u64,
    last_tick: Option<Instant>,
}

impl<M: ParameterModel> Default for Stage<M> {
    fn default() -> Self {
        Self {
            model: None,
            listeners: Vec::new(),
            frame_index: 0,
            last_tick: None,
        }
    }
}

impl<M: ParameterModel> Stage<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `model`, tearing down the previous model's listeners
    pub fn load_model(&mut self, model: M) -> Option<M> {
        let previous = self.unload_model();
        self.model = Some(model);
        previous
    }

    /// Remove the model and drop every listener registered for it
    pub fn unload_model(&mut self) -> Option<M> {
        if !self.listeners.is_empty() {
            debug!(count = self.listeners.len(), "Tearing down frame listeners");
        }
        self.listeners.clear();
        self.frame_index = 0;
        self.last_tick = None;
        self.model.take()
    }

    /// Attach a listener for the lifetime of the current model.
    ///
    /// Returns false (and drops the listener) when no model is loaded.
    pub fn register(&mut self, listener: impl FrameListener + 'static) -> bool {
        if self.model.is_none() {
            return false;
        }
        self.listeners.push(Box::new(listener));
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    /// Run every listener for one frame; no-op while no model is loaded
    pub fn tick(&mut self, now: Instant) -> Option<FrameTime> {
        let model = self.model.as_mut()?;

        let frame = FrameTime {
            now,
            delta: self
                .last_tick
                .map(|last| now.saturating_duration_since(last))
                .unwrap_or_default(),
            index: self.frame_index,
        };

        for listener in &mut self.listeners {
            listener.on_frame(&frame, &mut *model);
        }

        self.frame_index += 1;
        self.last_tick = Some(now);
        Some(frame)
    }
}
