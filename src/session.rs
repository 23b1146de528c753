//! Assistant conversation: request a reply, think, speak, return to idle.
//!
//! The conversation owns the [`SpeechContext`] and hands clones of it to the
//! speech collaborators and to the mouth driver.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::audio::{SpeechClip, SpeechPlayer, SyntheticSpeech};
use crate::error::Result;
use crate::lipsync::SpeechContext;
use crate::params::{AnalyserConfig, ConversationConfig, SyntheticSpeechConfig};

/// What the assistant is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationStatus {
    #[default]
    Idle,
    Thinking,
    Speaking,
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConversationStatus::Idle => "Idle",
            ConversationStatus::Thinking => "Thinking...",
            ConversationStatus::Speaking => "Speaking",
        };
        f.write_str(label)
    }
}

/// Voice used for replies
enum Voice {
    /// Recorded clip played through the output device
    Clip {
        clip: Arc<SpeechClip>,
        player: SpeechPlayer,
    },
    /// No samples; activity flag only
    Synthetic,
}

pub struct Conversation {
    config: ConversationConfig,
    ctx: SpeechContext,
    synthetic: SyntheticSpeech,
    voice: Voice,
    status: ConversationStatus,
    thinking_since: Option<Instant>,
    reply: String,
}

impl Conversation {
    /// Conversation that replies with synthetic speech only
    pub fn new(config: ConversationConfig, speech_config: SyntheticSpeechConfig) -> Self {
        let ctx = SpeechContext::new();
        Self {
            reply: config.default_reply.clone(),
            synthetic: SyntheticSpeech::new(ctx.clone(), speech_config),
            voice: Voice::Synthetic,
            status: ConversationStatus::Idle,
            thinking_since: None,
            config,
            ctx,
        }
    }

    /// Reply by playing `clip`; synthetic speech remains the fallback
    pub fn set_clip(&mut self, clip: SpeechClip, analyser: AnalyserConfig) -> Result<()> {
        let player = SpeechPlayer::new(self.ctx.clone(), analyser)?;
        self.voice = Voice::Clip {
            clip: Arc::new(clip),
            player,
        };
        Ok(())
    }

    /// Text spoken by the next reply
    pub fn set_reply(&mut self, text: impl Into<String>) {
        self.reply = text.into();
    }

    pub fn context(&self) -> &SpeechContext {
        &self.ctx
    }

    pub fn status(&self) -> ConversationStatus {
        self.status
    }

    fn set_status(&mut self, status: ConversationStatus) {
        if status != self.status {
            info!(from = %self.status, to = %status, "Conversation status changed");
            self.status = status;
        }
    }

    /// Ask for a reply; ignored unless idle
    pub fn request_reply(&mut self, now: Instant) -> bool {
        if self.status != ConversationStatus::Idle {
            return false;
        }
        self.thinking_since = Some(now);
        self.set_status(ConversationStatus::Thinking);
        true
    }

    /// Advance the conversation clock; call once per frame
    pub fn update(&mut self, now: Instant) -> ConversationStatus {
        match self.status {
            ConversationStatus::Idle => {}
            ConversationStatus::Thinking => {
                let delay = Duration::from_millis(self.config.thinking_delay_ms);
                let ready = self
                    .thinking_since
                    .is_some_and(|since| now.saturating_duration_since(since) >= delay);
                if ready {
                    self.thinking_since = None;
                    self.start_speaking(now);
                }
            }
            ConversationStatus::Speaking => {
                if let Voice::Clip { player, .. } = &mut self.voice {
                    player.poll();
                }
                if !self.ctx.is_speech_active() {
                    self.set_status(ConversationStatus::Idle);
                }
            }
        }
        self.status
    }

    fn start_speaking(&mut self, now: Instant) {
        if let Voice::Clip { clip, player } = &mut self.voice {
            match player.play(Arc::clone(clip), now) {
                Ok(()) => {
                    self.set_status(ConversationStatus::Speaking);
                    return;
                }
                Err(e) => warn!("Clip playback failed, using synthetic speech: {}", e),
            }
        }

        let duration = self.synthetic.speak(&self.reply, now);
        info!(reply = %self.reply, ?duration, "Speaking reply");
        self.set_status(ConversationStatus::Speaking);
    }

    /// Cancel thinking or speech and return to idle
    pub fn interrupt(&mut self) {
        self.thinking_since = None;
        if let Voice::Clip { player, .. } = &mut self.voice {
            player.stop();
        }
        self.synthetic.cancel();
        self.set_status(ConversationStatus::Idle);
    }
}
