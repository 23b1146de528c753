//! End-to-end lip-sync scenarios: speech context in, model parameters out.

use std::f32::consts::PI;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lipwave::audio::SpectrumAnalyser;
use lipwave::avatar::{FaceModel, ParameterDef, ParameterModel, ParameterSet, RigPreset, Stage};
use lipwave::lipsync::{DriveMode, EnergySource, MouthDriver, SharedEnergySource, SpeechContext};
use lipwave::params::AnalyserConfig;

const FRAME: Duration = Duration::from_micros(16_667);

/// Frames for openness to fall from fully open to below 0.01 at release 0.10
const RELEASE_FRAMES: usize = 44;

/// Source reporting the same byte in every bin
struct FlatSpectrum(u8);

impl EnergySource for FlatSpectrum {
    fn frequency_bin_count(&self) -> usize {
        128
    }

    fn read_byte_frequency_data(&self, bins: &mut [u8]) -> usize {
        bins.fill(self.0);
        bins.len()
    }
}

fn cubism_model() -> ParameterSet {
    ParameterSet::new(vec![
        ParameterDef::new("ParamMouthOpenY", 0.0, 1.0, 0.0),
        ParameterDef::new("ParamMouthForm", -1.0, 1.0, 0.0),
        ParameterDef::new("ParamBrowLY", -1.0, 1.0, 0.0),
        ParameterDef::new("ParamBrowRY", -1.0, 1.0, 0.0),
    ])
}

/// Run `frames` ticks starting at frame `first`, returning openness per frame
fn run(
    driver: &mut MouthDriver,
    ctx: &SpeechContext,
    model: &mut ParameterSet,
    t0: Instant,
    first: u32,
    frames: u32,
) -> Vec<f32> {
    let mut trace = Vec::with_capacity(frames as usize);
    for i in first..first + frames {
        driver.tick(ctx, Some(&mut *model as &mut dyn ParameterModel), t0 + FRAME * i);
        trace.push(model.get("ParamMouthOpenY").unwrap_or_default());
    }
    trace
}

#[test]
fn synthetic_speech_moves_the_mouth_over_time() {
    let ctx = SpeechContext::new();
    let t0 = Instant::now();
    ctx.set_speech_active_at(true, t0);

    let mut driver = MouthDriver::default();
    let mut model = cubism_model();
    let trace = run(&mut driver, &ctx, &mut model, t0, 0, 16);

    assert_eq!(driver.mode(), DriveMode::Synthetic);
    // Frame 15 is 250ms in
    assert!((trace[15] - trace[0]).abs() > 1e-3);
    assert!(trace.iter().all(|&o| o > 0.0 && o <= 1.0));
}

#[test]
fn silent_source_settles_at_active_floor() {
    let ctx = SpeechContext::new();
    let t0 = Instant::now();
    ctx.set_energy_source(Some(Arc::new(FlatSpectrum(128))));
    ctx.set_speech_active_at(true, t0);

    let mut driver = MouthDriver::default();
    let mut model = cubism_model();
    let open = run(&mut driver, &ctx, &mut model, t0, 0, 20);
    assert!(open[19] > 0.99);

    // Live audio goes quiet but speech is still active
    ctx.set_energy_source(Some(Arc::new(FlatSpectrum(0))));
    let decay = run(&mut driver, &ctx, &mut model, t0, 20, 150);

    assert_eq!(driver.mode(), DriveMode::AudioDriven);
    assert!(decay.iter().all(|&o| o >= 0.06));
    assert!((decay[149] - 0.06).abs() < 1e-3);
}

#[test]
fn deactivation_closes_mouth_within_release_window() {
    let ctx = SpeechContext::new();
    let t0 = Instant::now();
    ctx.set_energy_source(Some(Arc::new(FlatSpectrum(255))));
    ctx.set_speech_active_at(true, t0);

    let mut driver = MouthDriver::default();
    let mut model = cubism_model();
    run(&mut driver, &ctx, &mut model, t0, 0, 20);

    ctx.set_speech_active_at(false, t0 + FRAME * 20);
    let release = run(&mut driver, &ctx, &mut model, t0, 20, 200);

    assert!(release[RELEASE_FRAMES - 1] < 0.01);
    // Strictly decreasing until it rests at exactly zero
    let rest = release.iter().position(|&o| o == 0.0).unwrap();
    assert!(release[..rest].windows(2).all(|w| w[1] < w[0]));
    assert!(release[rest..].iter().all(|&o| o == 0.0));
}

#[test]
fn playback_end_falls_back_to_idle() {
    let ctx = SpeechContext::new();
    let t0 = Instant::now();
    let source: SharedEnergySource = Arc::new(FlatSpectrum(200));
    ctx.set_energy_source(Some(Arc::clone(&source)));
    ctx.set_speech_active_at(true, t0);

    let mut driver = MouthDriver::default();
    let mut model = cubism_model();
    run(&mut driver, &ctx, &mut model, t0, 0, 5);
    assert_eq!(driver.mode(), DriveMode::AudioDriven);

    assert!(ctx.finish_source(&source));
    run(&mut driver, &ctx, &mut model, t0, 5, 1);
    assert_eq!(driver.mode(), DriveMode::Idle);
}

#[test]
fn analyser_tone_opens_mouth() {
    let analyser = Arc::new(SpectrumAnalyser::new(AnalyserConfig::default()).unwrap());
    let tone: Vec<f32> = (0..256)
        .map(|i| 0.8 * (2.0 * PI * 16.0 * i as f32 / 256.0).sin())
        .collect();
    analyser.tap().push(&tone);

    let ctx = SpeechContext::new();
    let t0 = Instant::now();
    ctx.set_energy_source(Some(analyser.clone() as SharedEnergySource));
    ctx.set_speech_active_at(true, t0);

    let mut driver = MouthDriver::default();
    let mut model = cubism_model();
    let trace = run(&mut driver, &ctx, &mut model, t0, 0, 10);
    assert!(trace[9] > 0.3);

    // Signal gone: nothing readable, so only the active floor remains
    analyser.tap().finish();
    let tail = run(&mut driver, &ctx, &mut model, t0, 10, 120);
    assert!((tail[119] - 0.06).abs() < 1e-3);
}

#[test]
fn stage_drives_face_rigs_with_different_vocabularies() {
    for (rig, mouth_id) in [
        (RigPreset::Cubism3, "ParamMouthOpenY"),
        (RigPreset::Cubism2, "PARAM_MOUTH_OPEN_Y"),
        (RigPreset::Minimal, "MouthOpen"),
    ] {
        let ctx = SpeechContext::new();
        let t0 = Instant::now();
        ctx.set_speech_active_at(true, t0);

        let mut stage = Stage::new();
        stage.load_model(FaceModel::new(rig));
        assert!(stage.register(MouthDriver::default().into_listener(ctx.clone())));

        for i in 0..10 {
            stage.tick(t0 + FRAME * i);
        }

        let face = stage.model().unwrap();
        assert!(face.mouth_open() > 0.0, "{:?} mouth stayed shut", rig);
        assert_eq!(face.parameters().get(mouth_id), Some(face.mouth_open()));
    }
}

#[test]
fn reloading_model_detaches_driver() {
    let ctx = SpeechContext::new();
    let t0 = Instant::now();
    ctx.set_speech_active_at(true, t0);

    let mut stage = Stage::new();
    stage.load_model(FaceModel::new(RigPreset::Cubism3));
    stage.register(MouthDriver::default().into_listener(ctx.clone()));
    stage.tick(t0);

    stage.load_model(FaceModel::new(RigPreset::Cubism3));
    assert_eq!(stage.listener_count(), 0);
    stage.tick(t0 + FRAME);
    assert_eq!(stage.model().unwrap().mouth_open(), 0.0);
}
