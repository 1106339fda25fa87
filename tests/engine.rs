use std::sync::{Arc, Mutex};
use theremin::graph::MIX_TIME_CONSTANT;
use theremin::presets::DEFAULT_PRESET;
use theremin::{
    ControlBinding, DeviceConfig, FileStorage, MemoryStorage, ParamId, PlayState, Port,
    PresetStorage, PresetStore, Settings, StageId, Surface, ThereminEngine, ThereminError,
    ToneShape,
};

const SAMPLE_RATE: u32 = 8000;

fn engine() -> ThereminEngine {
    let mut engine = ThereminEngine::new(DeviceConfig {
        sample_rate: SAMPLE_RATE,
        channels: 1,
    })
    .unwrap();
    engine.set_surface(Surface::new(100.0, 100.0));
    engine
}

fn param(engine: &ThereminEngine, id: ParamId) -> f64 {
    engine.graph().param(id).unwrap().value()
}

fn render_seconds(engine: &mut ThereminEngine, seconds: f64) -> Vec<f32> {
    let mut buffer = vec![0.0f32; (seconds * SAMPLE_RATE as f64) as usize];
    engine.render(&mut buffer);
    buffer
}

#[derive(Default)]
struct Log {
    frequencies: Vec<f64>,
    positions: Vec<Option<(f64, f64)>>,
    syncs: usize,
    warnings: Vec<String>,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Log>>);

impl ControlBinding for Recorder {
    fn show_frequency(&mut self, hz: f64) {
        self.0.lock().unwrap().frequencies.push(hz);
    }

    fn show_position(&mut self, position: Option<(f64, f64)>) {
        self.0.lock().unwrap().positions.push(position);
    }

    fn sync_settings(&mut self, _settings: &Settings) {
        self.0.lock().unwrap().syncs += 1;
    }

    fn show_warning(&mut self, message: &str) {
        self.0.lock().unwrap().warnings.push(message.to_string());
    }
}

#[test]
fn test_pitch_follows_height() {
    let recorder = Recorder::default();
    let mut engine = engine().with_binding(recorder.clone());

    engine.pointer_down(100.0, 100.0);
    engine.pointer_move(100.0, 50.0);
    engine.pointer_move(100.0, 0.0);
    let log = recorder.0.lock().unwrap();
    assert_eq!(log.frequencies, vec![65.0, 1517.5, 3000.0]);
    assert_eq!(log.positions.last(), Some(&Some((1.0, 1.0))));
    drop(log);

    render_seconds(&mut engine, 0.2);
    assert!((param(&engine, ParamId::Frequency) - 3000.0).abs() < 1.0);
}

#[test]
fn test_volume_scales_with_sensitivity() {
    let mut engine = engine();
    engine.set_volume_sensitivity(0.5);
    engine.pointer_down(100.0, 50.0);
    render_seconds(&mut engine, 0.3);
    assert!((param(&engine, ParamId::Volume) - 0.5).abs() < 1e-3);
}

#[test]
fn test_pointer_down_resumes_and_sounds() {
    let mut engine = engine();
    assert!(render_seconds(&mut engine, 0.05).iter().all(|&s| s == 0.0));
    engine.pointer_down(100.0, 50.0);
    let samples = render_seconds(&mut engine, 0.2);
    assert!(samples.iter().any(|s| s.abs() > 0.5));
}

#[test]
fn test_release_fades_to_silence() {
    let recorder = Recorder::default();
    let mut engine = engine().with_binding(recorder.clone());
    engine.pointer_down(100.0, 50.0);
    render_seconds(&mut engine, 0.2);
    assert!(engine.pointer_up());
    assert!(!engine.pointer_leave());
    assert_eq!(engine.pending_tasks(), 1);
    assert_eq!(
        recorder.0.lock().unwrap().positions.last(),
        Some(&None)
    );

    render_seconds(&mut engine, 0.2);
    assert_eq!(engine.play_state(), PlayState::Idle);
    assert_eq!(param(&engine, ParamId::Volume), 0.0);
    assert!(render_seconds(&mut engine, 0.05).iter().all(|&s| s == 0.0));
}

#[test]
fn test_double_stop_while_idle() {
    let mut engine = engine();
    assert!(!engine.pointer_up());
    assert!(!engine.pointer_up());
    assert_eq!(engine.pending_tasks(), 0);
    assert_eq!(engine.play_state(), PlayState::Idle);
}

#[test]
fn test_rebuild_twice_is_identical() {
    let mut engine = engine();
    engine.set_distortion_enabled(true);
    engine.set_reverb_enabled(true);
    let edges = engine.graph().edges();
    engine.set_reverb_enabled(true);
    assert_eq!(engine.graph().edges(), edges);
}

#[test]
fn test_reverb_mix_gains() {
    let mut engine = engine();
    engine.set_reverb_mix(0.3);
    engine.set_reverb_enabled(true);

    let into_tap: Vec<StageId> = engine
        .graph()
        .edges()
        .into_iter()
        .filter(|edge| edge.to == StageId::AnalysisTap)
        .map(|edge| edge.from)
        .collect();
    assert_eq!(into_tap, vec![StageId::DryGain, StageId::WetGain]);
    assert!((param(&engine, ParamId::DryGain) - 0.7).abs() < 1e-12);
    assert!((param(&engine, ParamId::WetGain) - 0.3).abs() < 1e-12);
}

#[test]
fn test_mix_change_is_smoothed_without_rebuild() {
    let mut engine = engine();
    engine.set_reverb_enabled(true);
    engine.pointer_down(50.0, 50.0);
    let rebuilds = engine.rebuild_count();

    engine.set_reverb_mix(0.9);
    assert_eq!(engine.rebuild_count(), rebuilds);
    render_seconds(&mut engine, MIX_TIME_CONSTANT);
    let wet = param(&engine, ParamId::WetGain);
    assert!(wet > 0.3 && wet < 0.9);

    render_seconds(&mut engine, 10.0 * MIX_TIME_CONSTANT);
    assert!((param(&engine, ParamId::WetGain) - 0.9).abs() < 1e-3);
    assert!((param(&engine, ParamId::DryGain) - 0.1).abs() < 1e-3);
}

#[test]
fn test_tremolo_off_severs_modulator() {
    let mut engine = engine();
    engine.set_tremolo_enabled(true);
    assert_eq!(
        engine.graph().outgoing(StageId::TremoloModulator),
        &[(StageId::TremoloGate, Port::Control)]
    );
    engine.set_tremolo_enabled(false);
    assert!(engine.graph().outgoing(StageId::TremoloModulator).is_empty());
    assert!(
        !engine
            .graph()
            .processing_order()
            .contains(&StageId::TremoloModulator)
    );
}

#[test]
fn test_tremolo_modulates_loudness() {
    let mut engine = engine();
    engine.set_tone_shape(ToneShape::Square);
    engine.set_tremolo_rate(4.0);
    engine.set_tremolo_depth(1.0);
    engine.set_tremolo_enabled(true);
    engine.pointer_down(100.0, 50.0);
    let samples = render_seconds(&mut engine, 0.5);

    // Peak level in 25 ms windows swings between loud and nearly silent
    let peaks: Vec<f32> = samples[800..]
        .chunks(200)
        .map(|window| window.iter().fold(0.0f32, |m, s| m.max(s.abs())))
        .collect();
    let loudest = peaks.iter().cloned().fold(0.0f32, f32::max);
    let quietest = peaks.iter().cloned().fold(f32::MAX, f32::min);
    assert!(loudest > 0.8);
    assert!(quietest < 0.3);
}

#[test]
fn test_preset_round_trip() {
    let mut engine = engine();
    engine.set_tone_shape(ToneShape::Triangle);
    engine.set_reverb_enabled(true);
    engine.set_reverb_mix(0.6);
    engine.set_tremolo_depth(0.25);
    let saved = engine.settings().clone();
    engine.save_preset("P").unwrap();

    engine.load_preset(DEFAULT_PRESET).unwrap();
    assert_eq!(engine.settings(), &Settings::default());

    engine.load_preset("P").unwrap();
    assert_eq!(engine.settings(), &saved);
    assert_eq!(engine.current_preset(), "P");
    assert_eq!(engine.preset_names(), vec!["P".to_string(), "default".to_string()]);
    assert!((param(&engine, ParamId::WetGain) - 0.6).abs() < 1e-12);
}

#[test]
fn test_missing_preset_changes_nothing() {
    let recorder = Recorder::default();
    let mut engine = engine().with_binding(recorder.clone());
    engine.set_distortion_enabled(true);
    let settings = engine.settings().clone();
    let rebuilds = engine.rebuild_count();
    let syncs = recorder.0.lock().unwrap().syncs;

    assert_eq!(
        engine.load_preset("missing"),
        Err(ThereminError::PresetNotFound("missing".to_string()))
    );
    assert_eq!(engine.settings(), &settings);
    assert_eq!(engine.rebuild_count(), rebuilds);
    assert_eq!(engine.current_preset(), DEFAULT_PRESET);

    let log = recorder.0.lock().unwrap();
    assert_eq!(log.syncs, syncs);
    assert_eq!(log.warnings, vec!["preset not found: 'missing'".to_string()]);
}

#[test]
fn test_empty_preset_name_is_warned() {
    let recorder = Recorder::default();
    let mut engine = engine().with_binding(recorder.clone());
    assert!(matches!(
        engine.save_preset(""),
        Err(ThereminError::InvalidParameter(_))
    ));
    assert_eq!(engine.preset_names(), vec!["default".to_string()]);
    assert_eq!(recorder.0.lock().unwrap().warnings.len(), 1);
}

#[test]
fn test_presets_persist_to_storage() {
    let storage = MemoryStorage::new();
    let mut engine = engine().with_storage(storage.clone());
    engine.set_tremolo_enabled(true);
    engine.save_preset("wobble").unwrap();

    let reloaded = PresetStore::load_from(&storage);
    assert!(reloaded.load("wobble").unwrap().tremolo_enabled);

    let mut other = self::engine().with_storage(storage);
    other.load_preset("wobble").unwrap();
    assert!(other.settings().tremolo_enabled);
}

#[test]
fn test_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("presets.json");
    let mut storage = FileStorage::new(&path);
    assert_eq!(storage.read().unwrap(), None);

    let mut store = PresetStore::new();
    store
        .save(
            "bright",
            &Settings {
                tone_shape: ToneShape::Sawtooth,
                ..Settings::default()
            },
        )
        .unwrap();
    store.persist(&mut storage).unwrap();

    assert!(path.exists());
    assert_eq!(PresetStore::load_from(&FileStorage::new(&path)), store);
}

#[test]
fn test_recording_captures_output() {
    let mut engine = engine();
    assert!(engine.stop_recording().is_none());
    engine.pointer_down(100.0, 50.0);
    assert!(engine.start_recording());
    assert!(!engine.start_recording());
    let rendered = render_seconds(&mut engine, 0.128);

    let recording = engine.stop_recording().unwrap();
    assert!(!engine.is_recording());
    assert_eq!(recording.sample_rate(), SAMPLE_RATE);
    assert_eq!(recording.samples(), rendered.as_slice());
}

#[test]
fn test_analysis_snapshots() {
    let mut engine = engine();
    engine.pointer_down(100.0, 50.0);
    render_seconds(&mut engine, 0.5);
    let tap = engine.analysis_tap_mut().unwrap();
    tap.set_fft_size(256);
    assert_eq!(tap.byte_frequency_data().len(), 128);

    let tap = engine.analysis_tap_mut().unwrap();
    let mut output = vec![0.0; 256];
    let input: Vec<f64> = (0..256).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
    tap.process(&input, &mut output);
    assert!(tap.time_domain_data().iter().all(|s| s.abs() == 0.5));
}

#[test]
fn test_reenabled_reverb_has_no_stale_tail() {
    let mut engine = engine();
    engine.set_reverb_mix(1.0);
    engine.set_reverb_enabled(true);
    engine.pointer_down(100.0, 50.0);
    let wet = render_seconds(&mut engine, 0.5);
    assert!(wet.iter().any(|s| s.abs() > 0.01));

    engine.set_reverb_enabled(false);
    engine.pointer_up();
    let quiet = render_seconds(&mut engine, 3.0);
    assert_eq!(engine.play_state(), PlayState::Idle);
    assert!(quiet[quiet.len() / 2..].iter().all(|&s| s == 0.0));

    engine.set_reverb_enabled(true);
    let peak = render_seconds(&mut engine, 0.5)
        .iter()
        .fold(0.0f32, |peak, s| peak.max(s.abs()));
    assert!(peak < 1e-6, "old reverb tail replayed: peak {}", peak);
}

#[test]
fn test_close_ends_the_performance() {
    let mut engine = engine();
    engine.pointer_down(100.0, 50.0);
    render_seconds(&mut engine, 0.05);
    engine.close();
    assert_eq!(engine.play_state(), PlayState::Idle);
    assert!(!engine.pointer_up());
    assert_eq!(engine.pending_tasks(), 0);
    for x in 0..1000 {
        assert!(!engine.pointer_move(x as f64 / 10.0, 50.0));
    }
    render_seconds(&mut engine, 1.0);
    assert!(!engine.is_sounding());
}

#[test]
fn test_close_is_terminal() {
    let mut engine = engine();
    engine.pointer_down(100.0, 50.0);
    render_seconds(&mut engine, 0.05);
    engine.close();
    engine.pointer_down(100.0, 50.0);
    assert!(render_seconds(&mut engine, 0.05).iter().all(|&s| s == 0.0));
}
