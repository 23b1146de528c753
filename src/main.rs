//! lipwave - talking-avatar demo
//!
//! A procedural face whose mouth follows speech: recorded audio through a
//! live spectrum, or a synthetic talking rhythm when no samples exist.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use lipwave::audio::{SpectrumAnalyser, SpeechClip};
use lipwave::avatar::{FaceModel, RigPreset, Stage, Vertex};
use lipwave::cli::Args;
use lipwave::error::Result;
use lipwave::lipsync::{MouthDriver, SharedEnergySource, SpeechContext};
use lipwave::params::*;
use lipwave::rendering::RenderSystem;
use lipwave::session::{Conversation, ConversationStatus};

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Character and conversation
    stage: Stage<FaceModel>,
    conversation: Conversation,
    vertices: Vec<Vertex>,

    // Configuration
    render_config: RenderConfig,
    recording_config: Option<RecordingConfig>,

    // Time tracking
    start_time: Instant,
    frame_num: usize,
    shown_status: Option<ConversationStatus>,
}

impl App {
    fn new(
        rig: RigPreset,
        tuning: LipSyncTuning,
        conversation: Conversation,
        recording_config: Option<RecordingConfig>,
    ) -> Self {
        let mut stage = Stage::new();
        stage.load_model(FaceModel::new(rig));

        // Registered once for the lifetime of the loaded face
        let driver = MouthDriver::new(tuning);
        stage.register(driver.into_listener(conversation.context().clone()));

        Self {
            window: None,
            render_system: None,
            stage,
            conversation,
            vertices: Vec::new(),
            render_config: RenderConfig::default(),
            recording_config,
            start_time: Instant::now(),
            frame_num: 0,
            shown_status: None,
        }
    }

    /// Frame timestamp: wall clock, or a fixed step while recording
    fn frame_time(&self) -> Instant {
        match &self.recording_config {
            Some(config) => {
                self.start_time
                    + Duration::from_secs_f64(self.frame_num as f64 / config.fps as f64)
            }
            None => Instant::now(),
        }
    }

    fn update_title(&mut self) {
        let status = self.conversation.status();
        if self.shown_status == Some(status) {
            return;
        }
        if let (Some(window), Some(face)) = (&self.window, self.stage.model()) {
            window.set_title(&format!("lipwave [{}] - {}", face.rig().name(), status));
        }
        self.shown_status = Some(status);
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("lipwave")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.render_config.clone(),
            self.recording_config.clone(),
        ));
        let render_system = match render_system {
            Ok(render_system) => render_system,
            Err(e) => {
                error!("Failed to initialize renderer: {}", e);
                event_loop.exit();
                return;
            }
        };

        info!("Press SPACE to ask for a reply, BACKSPACE to interrupt, ESC to quit");

        self.window = Some(window);
        self.render_system = Some(render_system);
        self.start_time = Instant::now();
        self.update_title();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(key),
                        repeat: false,
                        ..
                    },
                ..
            } => match key {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::Space => {
                    let now = self.frame_time();
                    self.conversation.request_reply(now);
                }
                KeyCode::Backspace => self.conversation.interrupt(),
                _ => {}
            },
            WindowEvent::Resized(size) => {
                if let Some(render_system) = &mut self.render_system {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame(event_loop);
            }
            _ => {}
        }
    }
}

impl App {
    /// Render a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        if self.render_system.is_none() {
            return;
        }

        let now = self.frame_time();
        self.conversation.update(now);
        self.update_title();

        // Mouth driver runs as a stage listener
        self.stage.tick(now);
        if let Some(face) = self.stage.model() {
            face.build_mesh(&mut self.vertices);
        }

        let Some(render_system) = &mut self.render_system else {
            return;
        };
        render_system.update_vertices(&self.vertices);

        match render_system.render(self.frame_num) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    render_system.resize(size.width, size.height);
                }
            }
            Err(e) => error!("Render error: {:?}", e),
        }

        self.frame_num += 1;

        if let Some(config) = &self.recording_config {
            if self.frame_num >= config.total_frames() {
                info!(frames = self.frame_num, dir = %config.frames_dir(), "Recording complete");
                event_loop.exit();
            }
        }
    }
}

/// Build the conversation, falling back to synthetic speech if the clip fails
fn build_conversation(args: &Args) -> Conversation {
    let mut conversation =
        Conversation::new(ConversationConfig::default(), SyntheticSpeechConfig::default());
    if let Some(reply) = &args.reply {
        conversation.set_reply(reply.clone());
    }

    let Some(path) = &args.speech_wav else {
        return conversation;
    };

    let clip = match SpeechClip::from_wav(path) {
        Ok(clip) => clip,
        Err(e) => {
            warn!("Could not load {}: {}; using synthetic speech", path.display(), e);
            return conversation;
        }
    };
    info!(path = %path.display(), secs = clip.duration_secs(), "Loaded speech clip");

    if let Err(e) = conversation.set_clip(clip, AnalyserConfig::default()) {
        warn!("Speech playback unavailable: {}", e);
    }
    conversation
}

/// Drive the face without a window and log every frame
fn trace_headless(args: &Args, tuning: LipSyncTuning, frames: usize) -> Result<()> {
    let fps = args.fps.max(1);
    let frame = Duration::from_secs_f64(1.0 / fps as f64);
    let ctx = SpeechContext::new();

    let mut stage = Stage::new();
    stage.load_model(FaceModel::new(args.parse_rig()));
    stage.register(MouthDriver::new(tuning).into_listener(ctx.clone()));

    // Optional clip, analysed offline at the frame rate
    let clip = args.speech_wav.as_ref().map(|p| SpeechClip::from_wav(p)).transpose()?;
    let analyser = match &clip {
        Some(_) => Some(Arc::new(SpectrumAnalyser::new(AnalyserConfig::default())?)),
        None => None,
    };

    let speech_frames = match &clip {
        Some(clip) => (clip.duration_secs() * fps as f32).ceil() as usize,
        None => {
            let text = args
                .reply
                .clone()
                .unwrap_or_else(|| ConversationConfig::default().default_reply);
            let duration = SyntheticSpeechConfig::default().estimate_duration(&text);
            (duration.as_secs_f32() * fps as f32).ceil() as usize
        }
    };

    info!(frames, fps, speech_frames, audio = clip.is_some(), "Headless trace");

    let t0 = Instant::now();
    if let Some(analyser) = &analyser {
        let source: SharedEnergySource = Arc::<SpectrumAnalyser>::clone(analyser);
        ctx.set_energy_source(Some(source));
    }
    ctx.set_speech_active_at(true, t0);

    for i in 0..frames {
        let now = t0 + frame * i as u32;
        if i == speech_frames {
            if let Some(analyser) = &analyser {
                analyser.tap().finish();
                ctx.set_energy_source(None);
            }
            ctx.set_speech_active_at(false, now);
        }

        if let (Some(clip), Some(analyser)) = (&clip, &analyser) {
            let per_frame = clip.sample_rate() as usize / fps as usize;
            let start = (i * per_frame).min(clip.samples().len());
            let end = (start + per_frame).min(clip.samples().len());
            analyser.tap().push(&clip.samples()[start..end]);
        }

        stage.tick(now);
        if let Some(face) = stage.model() {
            info!(
                frame = i,
                active = ctx.is_speech_active(),
                openness = face.mouth_open(),
                form = face.mouth_form(),
                "Mouth"
            );
        }
    }

    Ok(())
}

fn run() -> Result<()> {
    let args = Args::parse();
    let tuning = LipSyncTuning::default();
    tuning.validate()?;

    if let Some(frames) = args.trace_frames {
        return trace_headless(&args, tuning, frames);
    }

    let recording_config = args.create_recording_config()?;
    if let Some(config) = &recording_config {
        info!(
            secs = config.duration_secs,
            fps = config.fps,
            dir = %config.frames_dir(),
            "Recording frames"
        );
    }

    let conversation = build_conversation(&args);
    let mut app = App::new(args.parse_rig(), tuning, conversation, recording_config);

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("Failed to create event loop: {}", e);
            return Ok(());
        }
    };
    if let Err(e) = event_loop.run_app(&mut app) {
        error!("Event loop error: {}", e);
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lipwave=info")),
        )
        .init();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}
