//! Shared speech state written by playback/synthesis and read by the driver.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::energy::EnergySource;
use super::rhythm::RhythmClock;

/// Shared, attachable energy source handle
pub type SharedEnergySource = Arc<dyn EnergySource>;

#[derive(Default)]
struct SpeechState {
    active: bool,
    source: Option<SharedEnergySource>,
    rhythm: RhythmClock,
}

/// Speech activity, energy source and rhythm clock behind one lock.
///
/// Cloning yields another handle to the same state. Every setter is a single
/// atomic update; the driver reads one [`SpeechSnapshot`] per frame.
#[derive(Clone, Default)]
pub struct SpeechContext {
    state: Arc<Mutex<SpeechState>>,
}

/// Consistent view of [`SpeechContext`] for one frame
#[derive(Clone, Default)]
pub struct SpeechSnapshot {
    pub active: bool,
    pub source: Option<SharedEnergySource>,
    pub rhythm_started: Option<Instant>,
}

impl std::fmt::Debug for SpeechSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechSnapshot")
            .field("active", &self.active)
            .field("source_attached", &self.source.is_some())
            .field("rhythm_started", &self.rhythm_started)
            .finish()
    }
}

impl std::fmt::Debug for SpeechContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.snapshot().fmt(f)
    }
}

fn same_source(a: &SharedEnergySource, b: &SharedEnergySource) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl SpeechContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach or detach the live analysis source
    pub fn set_energy_source(&self, source: Option<SharedEnergySource>) {
        self.state.lock().source = source;
    }

    /// Mark vocalization start/stop at the current time
    pub fn set_speech_active(&self, active: bool) {
        self.set_speech_active_at(active, Instant::now());
    }

    /// Mark vocalization start/stop at `now`.
    ///
    /// Turning off resets the rhythm clock. Turning on without a source
    /// attached starts the clock if it is not already running.
    pub fn set_speech_active_at(&self, active: bool, now: Instant) {
        let mut state = self.state.lock();
        state.active = active;
        if !active {
            state.rhythm.reset();
        } else if state.source.is_none() {
            state.rhythm.start_if_unset(now);
        }
    }

    /// End a playback that owns `source`.
    ///
    /// Detaches it and clears activity only if it is still the attached
    /// source; a superseded playback leaves its successor alone. Returns
    /// whether anything changed.
    pub fn finish_source(&self, source: &SharedEnergySource) -> bool {
        let mut state = self.state.lock();
        let owns = state
            .source
            .as_ref()
            .is_some_and(|current| same_source(current, source));
        if owns {
            state.source = None;
            state.active = false;
            state.rhythm.reset();
        }
        owns
    }

    /// One frame's view, taken under a single lock.
    ///
    /// While speech is active without a source the rhythm clock is started
    /// at `now` if unset (source detached mid-utterance), so the regime and
    /// its clock always come from the same state.
    pub fn frame_snapshot(&self, now: Instant) -> SpeechSnapshot {
        let mut state = self.state.lock();
        if state.active && state.source.is_none() {
            state.rhythm.start_if_unset(now);
        }
        SpeechSnapshot {
            active: state.active,
            source: state.source.clone(),
            rhythm_started: state.rhythm.started(),
        }
    }

    pub fn is_speech_active(&self) -> bool {
        self.state.lock().active
    }

    pub fn has_energy_source(&self) -> bool {
        self.state.lock().source.is_some()
    }

    pub fn snapshot(&self) -> SpeechSnapshot {
        let state = self.state.lock();
        SpeechSnapshot {
            active: state.active,
            source: state.source.clone(),
            rhythm_started: state.rhythm.started(),
        }
    }
}
