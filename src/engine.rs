//! The theremin engine: one context object holding the whole instrument.

use crate::binding::{ControlBinding, NullBinding};
use crate::context::{AudioContext, ContextState, DeviceConfig, RENDER_QUANTUM};
use crate::controller::{PerformanceController, PlayState, Surface};
use crate::error::{ThereminError, clamp_param};
use crate::graph::{AnalysisTap, SignalGraph};
use crate::presets::{DEFAULT_PRESET, PresetStorage, PresetStore};
use crate::recording::Recording;
use crate::scheduler::{Scheduler, Task};
use crate::settings::{
    MAX_DISTORTION_DRIVE, MAX_TREMOLO_RATE, MAX_VOLUME_SENSITIVITY, MIN_TREMOLO_RATE, Settings,
    ToneShape,
};

/// Owns the device context, the signal graph and everything that drives it.
///
/// Toggling an effect rebuilds the graph topology; every other setter only
/// moves parameters. Audio is pulled with [`ThereminEngine::render`], which
/// also runs deferred work at render quantum boundaries.
///
/// # Examples
///
/// ```
/// use theremin::{DeviceConfig, Surface, ThereminEngine};
///
/// let mut engine = ThereminEngine::new(DeviceConfig::default()).unwrap();
/// engine.set_surface(Surface::new(100.0, 100.0));
/// engine.pointer_down(100.0, 50.0);
///
/// let mut buffer = vec![0.0f32; 1024];
/// engine.render(&mut buffer);
/// assert!(engine.is_sounding());
/// ```
pub struct ThereminEngine {
    context: AudioContext,
    graph: SignalGraph,
    controller: PerformanceController,
    scheduler: Scheduler,
    settings: Settings,
    presets: PresetStore,
    current_preset: String,
    binding: Box<dyn ControlBinding>,
    storage: Option<Box<dyn PresetStorage>>,
    surface: Surface,
    quantum: Vec<f64>,
    cursor: usize,
}

impl ThereminEngine {
    /// Creates a suspended engine with default settings.
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` if the device format cannot be rendered. This is
    /// the only fatal error.
    pub fn new(config: DeviceConfig) -> Result<Self, ThereminError> {
        let context = AudioContext::new(config)?;
        let settings = Settings::default();
        let graph = SignalGraph::new(context.sample_rate(), &settings)?;
        log::info!(
            "theremin engine created: {} Hz, {} channels",
            config.sample_rate,
            config.channels
        );
        Ok(Self {
            context,
            graph,
            controller: PerformanceController::new(),
            scheduler: Scheduler::new(),
            settings,
            presets: PresetStore::new(),
            current_preset: DEFAULT_PRESET.to_string(),
            binding: Box::new(NullBinding),
            storage: None,
            surface: Surface::new(1.0, 1.0),
            quantum: vec![0.0; RENDER_QUANTUM],
            cursor: RENDER_QUANTUM,
        })
    }

    /// Routes display updates to `binding`.
    pub fn with_binding(mut self, binding: impl ControlBinding + 'static) -> Self {
        self.binding = Box::new(binding);
        self.binding.sync_settings(&self.settings);
        self
    }

    /// Loads presets from `storage` and writes them back there on every save.
    pub fn with_storage(mut self, storage: impl PresetStorage + 'static) -> Self {
        self.presets = PresetStore::load_from(&storage);
        self.storage = Some(Box::new(storage));
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    pub fn device_config(&self) -> DeviceConfig {
        self.context.config()
    }

    pub fn context_state(&self) -> ContextState {
        self.context.state()
    }

    /// Render clock in seconds.
    pub fn current_time(&self) -> f64 {
        self.context.current_time()
    }

    pub fn play_state(&self) -> PlayState {
        self.controller.state()
    }

    pub fn is_sounding(&self) -> bool {
        self.controller.is_sounding()
    }

    /// Number of topology rebuilds so far, the initial wiring included.
    pub fn rebuild_count(&self) -> usize {
        self.graph.rebuild_count()
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    fn warn(&mut self, error: &ThereminError) {
        log::warn!("{}", error);
        self.binding.show_warning(&error.to_string());
    }

    fn rebuild(&mut self) {
        self.graph.rebuild(&self.settings);
        self.binding.sync_settings(&self.settings);
    }

    pub fn set_tone_shape(&mut self, shape: ToneShape) {
        self.settings.tone_shape = shape;
        self.graph.set_tone_shape(shape);
        self.binding.sync_settings(&self.settings);
    }

    pub fn set_reverb_enabled(&mut self, enabled: bool) {
        self.settings.reverb_enabled = enabled;
        self.rebuild();
    }

    pub fn set_reverb_mix(&mut self, mix: f64) {
        let mix = clamp_param("reverb_mix", mix, 0.0, 1.0);
        self.settings.reverb_mix = mix;
        self.graph.set_reverb_mix(mix, self.context.current_time());
        self.binding.sync_settings(&self.settings);
    }

    pub fn set_tremolo_enabled(&mut self, enabled: bool) {
        self.settings.tremolo_enabled = enabled;
        self.rebuild();
    }

    pub fn set_tremolo_rate(&mut self, rate_hz: f64) {
        let rate = clamp_param("tremolo_rate_hz", rate_hz, MIN_TREMOLO_RATE, MAX_TREMOLO_RATE);
        self.settings.tremolo_rate_hz = rate;
        self.graph.set_tremolo_rate(rate, self.context.current_time());
        self.binding.sync_settings(&self.settings);
    }

    pub fn set_tremolo_depth(&mut self, depth: f64) {
        let depth = clamp_param("tremolo_depth", depth, 0.0, 1.0);
        self.settings.tremolo_depth = depth;
        self.graph.set_tremolo_depth(depth, self.context.current_time());
        self.binding.sync_settings(&self.settings);
    }

    pub fn set_distortion_enabled(&mut self, enabled: bool) {
        self.settings.distortion_enabled = enabled;
        self.rebuild();
    }

    pub fn set_distortion_drive(&mut self, drive: f64) {
        let drive = clamp_param("distortion_drive", drive, 0.0, MAX_DISTORTION_DRIVE);
        self.settings.distortion_drive = drive;
        self.graph.set_distortion_drive(drive);
        self.binding.sync_settings(&self.settings);
    }

    /// Takes effect on the next pointer event.
    pub fn set_volume_sensitivity(&mut self, sensitivity: f64) {
        self.settings.volume_sensitivity = clamp_param(
            "volume_sensitivity",
            sensitivity,
            0.0,
            MAX_VOLUME_SENSITIVITY,
        );
        self.binding.sync_settings(&self.settings);
    }

    /// Sets the area pointer coordinates are relative to.
    pub fn set_surface(&mut self, surface: Surface) {
        self.surface = surface;
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// Engages the instrument at `(x, y)`, resuming the context if needed.
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        if !self.context.resume() {
            log::warn!("pointer down ignored: audio context is closed");
            return;
        }
        let position = self.surface.normalize(x, y);
        self.controller.pointer_down(
            &mut self.graph,
            &mut self.scheduler,
            self.binding.as_mut(),
            self.context.current_time(),
            position,
            self.settings.volume_sensitivity,
        );
    }

    /// Returns false when not engaged or closed; the move is then ignored.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        if self.context.state() == ContextState::Closed {
            return false;
        }
        let position = self.surface.normalize(x, y);
        self.controller.pointer_move(
            &mut self.graph,
            self.binding.as_mut(),
            self.context.current_time(),
            position,
            self.settings.volume_sensitivity,
        )
    }

    /// Starts the release fade. Repeated calls, and calls after `close`,
    /// are ignored.
    pub fn pointer_up(&mut self) -> bool {
        if self.context.state() == ContextState::Closed {
            return false;
        }
        self.controller.stop(
            &mut self.graph,
            &mut self.scheduler,
            self.binding.as_mut(),
            self.context.current_time(),
        )
    }

    /// Same as [`ThereminEngine::pointer_up`].
    pub fn pointer_leave(&mut self) -> bool {
        self.pointer_up()
    }

    /// Saves the live settings under `name` and persists the preset map.
    ///
    /// An empty name is refused and reported as a warning. Storage failures
    /// only warn; the preset stays saved in memory.
    pub fn save_preset(&mut self, name: &str) -> Result<(), ThereminError> {
        if let Err(e) = self.presets.save(name, &self.settings) {
            self.warn(&e);
            return Err(e);
        }
        self.current_preset = name.to_string();
        log::info!("saved preset '{}'", name);
        if let Some(storage) = self.storage.as_mut()
            && let Err(e) = self.presets.persist(storage.as_mut())
        {
            self.warn(&e);
        }
        Ok(())
    }

    /// Replaces the live settings with the preset `name` and rebuilds.
    ///
    /// An unknown name leaves everything untouched.
    pub fn load_preset(&mut self, name: &str) -> Result<(), ThereminError> {
        let settings = match self.presets.load(name) {
            Ok(settings) => settings,
            Err(e) => {
                self.warn(&e);
                return Err(e);
            }
        };
        self.settings = settings.sanitized();
        self.current_preset = name.to_string();
        self.graph.apply(&self.settings);
        self.binding.sync_settings(&self.settings);
        log::info!("loaded preset '{}'", name);
        Ok(())
    }

    pub fn preset_names(&self) -> Vec<String> {
        self.presets.names()
    }

    /// Name of the preset last saved or loaded.
    pub fn current_preset(&self) -> &str {
        &self.current_preset
    }

    /// Starts capturing the analysis tap. Returns false if already recording.
    pub fn start_recording(&mut self) -> bool {
        let started = self
            .graph
            .analysis_tap_mut()
            .is_some_and(AnalysisTap::start_capture);
        if started {
            log::info!("recording started at {:.3}s", self.context.current_time());
        }
        started
    }

    /// Ends the capture, or returns `None` if nothing was recording.
    pub fn stop_recording(&mut self) -> Option<Recording> {
        let samples = self.graph.analysis_tap_mut()?.stop_capture()?;
        let recording = Recording::new(self.context.config().sample_rate, samples);
        log::info!("recording stopped: {:.2}s", recording.duration_seconds());
        Some(recording)
    }

    pub fn is_recording(&self) -> bool {
        self.graph
            .analysis_tap()
            .is_some_and(AnalysisTap::is_capturing)
    }

    pub fn analysis_tap(&self) -> Option<&AnalysisTap> {
        self.graph.analysis_tap()
    }

    /// Mutable access, for frequency snapshots and analysis settings.
    pub fn analysis_tap_mut(&mut self) -> Option<&mut AnalysisTap> {
        self.graph.analysis_tap_mut()
    }

    /// Fills `out` with interleaved frames for every device channel.
    ///
    /// Writes silence while the context is not running.
    pub fn render(&mut self, out: &mut [f32]) {
        if self.context.state() != ContextState::Running {
            out.fill(0.0);
            return;
        }
        let channels = self.context.channels();
        for frame in out.chunks_mut(channels) {
            if self.cursor >= RENDER_QUANTUM {
                self.render_quantum();
            }
            frame.fill(self.quantum[self.cursor] as f32);
            self.cursor += 1;
        }
    }

    fn render_quantum(&mut self) {
        let now = self.context.current_time();
        for (id, task) in self.scheduler.take_due(now) {
            match task {
                Task::FinalizeRelease => {
                    if self.controller.finalize_release(&mut self.graph, id) {
                        log::debug!("release finalised at {:.3}s", now);
                    }
                }
            }
        }
        self.graph.render_quantum(now, &mut self.quantum);
        self.context.advance(RENDER_QUANTUM);
        self.cursor = 0;
    }

    /// Stops every source and closes the context for good.
    ///
    /// The performance state drops to idle and pending tasks are discarded.
    /// Pointer events are ignored from then on.
    pub fn close(&mut self) {
        if self.context.state() == ContextState::Closed {
            return;
        }
        self.graph.stop_sources();
        self.scheduler.clear();
        self.controller.halt(self.binding.as_mut());
        self.context.close();
        log::info!("theremin engine closed");
    }
}
