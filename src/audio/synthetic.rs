//! Speech engine stand-in that exposes no samples.
//!
//! Only the speech activity flag is driven, so the lip-sync driver falls
//! back to its synthetic rhythm for the utterance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::lipsync::SpeechContext;
use crate::params::SyntheticSpeechConfig;

/// Timed utterances with cancellation
pub struct SyntheticSpeech {
    config: SyntheticSpeechConfig,
    ctx: SpeechContext,
    /// Bumped on every speak/cancel; a timer only ends its own utterance
    generation: Arc<AtomicU64>,
}

impl SyntheticSpeech {
    pub fn new(ctx: SpeechContext, config: SyntheticSpeechConfig) -> Self {
        Self {
            config,
            ctx,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Begin "saying" `text` at frame time `now`.
    ///
    /// The rhythm clock starts at `now`, which may lag the wall clock when
    /// frames are stepped at a fixed rate. Returns the estimated utterance
    /// length.
    pub fn speak(&self, text: &str, now: Instant) -> Duration {
        let duration = self.config.estimate_duration(text);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        self.ctx.set_speech_active_at(true, now);
        debug!(?duration, generation, "Synthetic utterance started");

        let ctx = self.ctx.clone();
        let current = Arc::clone(&self.generation);
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let deadline = Instant::now() + duration;

        thread::spawn(move || {
            while Instant::now() < deadline {
                if current.load(Ordering::Acquire) != generation {
                    return;
                }
                thread::sleep(poll.min(deadline.saturating_duration_since(Instant::now())));
            }
            if current.load(Ordering::Acquire) == generation {
                ctx.set_speech_active(false);
                debug!(generation, "Synthetic utterance finished");
            }
        });

        duration
    }

    /// Stop the current utterance immediately
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.ctx.set_speech_active(false);
    }
}

impl Drop for SyntheticSpeech {
    fn drop(&mut self) {
        // Orphan any running timer
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}
