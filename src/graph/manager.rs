//! The signal graph manager.
//!
//! Owns every stage for the lifetime of the engine and is the only place
//! connections are made or broken. The topology is never edited piecemeal:
//! each rebuild severs everything and rewires from `topology(settings)`.

use super::analyser::AnalysisTap;
use super::stage::{Edge, Port, Processor, Quantum, Stage, StageConfig, StageId};
use super::topology::topology;
use crate::context::RENDER_QUANTUM;
use crate::effects::{
    CURVE_RESOLUTION, Convolver, IMPULSE_CHANNELS, IMPULSE_SECONDS, ImpulseResponse,
    TremoloModulator, WaveShaper, distortion_curve, impulse_response, tremolo_gate_gain,
};
use crate::error::ThereminError;
use crate::oscillators::ToneOscillator;
use crate::settings::Settings;
use crate::AudioParam;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Dfs, Reversed};

/// Time constant for wet/dry mix changes, in seconds.
pub const MIX_TIME_CONSTANT: f64 = 0.05;

/// Frequency the tone source holds before the first pointer event.
const INITIAL_FREQUENCY: f64 = 440.0;
/// Upper bound on any gate gain.
const MAX_GAIN: f64 = 4.0;

/// Parameters other components may automate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamId {
    /// Tone source frequency in Hz
    Frequency,
    /// Amplitude gate gain
    Volume,
    /// Intrinsic gain of the tremolo gate
    TremoloGain,
    DryGain,
    WetGain,
}

impl ParamId {
    fn stage(self) -> StageId {
        match self {
            ParamId::Frequency => StageId::ToneSource,
            ParamId::Volume => StageId::AmplitudeGate,
            ParamId::TremoloGain => StageId::TremoloGate,
            ParamId::DryGain => StageId::DryGain,
            ParamId::WetGain => StageId::WetGain,
        }
    }
}

pub struct SignalGraph {
    sample_rate: f64,
    stages: Vec<Stage>,
    impulse: ImpulseResponse,
    order: Vec<StageId>,
    buffers: Vec<Vec<f64>>,
    signal_in: Vec<f64>,
    control_in: Vec<f64>,
    rebuilds: usize,
}

impl SignalGraph {
    /// Builds every stage and wires the topology for `settings`.
    ///
    /// The reverb impulse is generated here, once, from fresh noise.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Rate every stage renders at, in Hz
    /// * `settings` - Initial effect settings; out-of-range values are clamped
    ///
    /// # Examples
    ///
    /// ```
    /// use theremin::{Settings, SignalGraph, StageId};
    ///
    /// let graph = SignalGraph::new(8000.0, &Settings::default()).unwrap();
    /// assert_eq!(graph.processing_order().last(), Some(&StageId::Output));
    /// ```
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` for a sample rate the stages cannot run at.
    pub fn new(sample_rate: f64, settings: &Settings) -> Result<Self, ThereminError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ThereminError::DeviceUnavailable(format!(
                "cannot build stages at {} Hz",
                sample_rate
            )));
        }
        let impulse = impulse_response(IMPULSE_SECONDS, sample_rate as u32, IMPULSE_CHANNELS);
        Self::with_impulse(sample_rate, settings, impulse)
    }

    /// Like `new` but convolves with the given impulse response.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Rate every stage renders at, in Hz
    /// * `settings` - Initial effect settings
    /// * `impulse` - Response for the reverb unit; multi-channel responses are downmixed
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` for a sample rate the stages cannot run at.
    pub fn with_impulse(
        sample_rate: f64,
        settings: &Settings,
        impulse: ImpulseResponse,
    ) -> Result<Self, ThereminError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ThereminError::DeviceUnavailable(format!(
                "cannot build stages at {} Hz",
                sample_rate
            )));
        }
        let settings = settings.sanitized();
        let nyquist = sample_rate / 2.0;
        let gate = |gain: f64| Processor::Gate {
            gain: AudioParam::new(gain, 0.0, MAX_GAIN),
        };

        let stages = StageId::ALL
            .iter()
            .map(|&id| {
                let processor = match id {
                    StageId::ToneSource => Processor::Tone {
                        oscillator: ToneOscillator::new(
                            settings.tone_shape,
                            INITIAL_FREQUENCY,
                            sample_rate,
                        ),
                        frequency: AudioParam::new(INITIAL_FREQUENCY, 0.0, nyquist),
                        running: true,
                    },
                    StageId::AmplitudeGate => gate(0.0),
                    StageId::DistortionShaper => Processor::Shaper(WaveShaper::new(
                        distortion_curve(settings.distortion_drive, CURVE_RESOLUTION),
                    )),
                    StageId::TremoloGate => gate(tremolo_gate_gain(settings.tremolo_depth)),
                    StageId::TremoloModulator => Processor::Modulator {
                        lfo: TremoloModulator::new(
                            settings.tremolo_rate_hz,
                            settings.tremolo_depth,
                            sample_rate,
                        ),
                        running: true,
                    },
                    StageId::ReverbUnit => {
                        Processor::Reverb(Convolver::from_impulse(&impulse, RENDER_QUANTUM))
                    }
                    StageId::DryGain => gate(1.0 - settings.reverb_mix),
                    StageId::WetGain => gate(settings.reverb_mix),
                    StageId::AnalysisTap => Processor::Tap(AnalysisTap::new()),
                    StageId::Output => Processor::Output,
                };
                Stage::new(id, processor)
            })
            .collect();

        let mut graph = Self {
            sample_rate,
            stages,
            impulse,
            order: Vec::new(),
            buffers: vec![vec![0.0; RENDER_QUANTUM]; StageId::ALL.len()],
            signal_in: vec![0.0; RENDER_QUANTUM],
            control_in: vec![0.0; RENDER_QUANTUM],
            rebuilds: 0,
        };
        graph.rebuild(&settings);
        Ok(graph)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// The impulse the reverb was built from.
    pub fn impulse(&self) -> &ImpulseResponse {
        &self.impulse
    }

    /// The stage with the given id. Every id always has exactly one stage.
    pub fn stage(&self, id: StageId) -> &Stage {
        &self.stages[id.index()]
    }

    fn stage_mut(&mut self, id: StageId) -> &mut Stage {
        &mut self.stages[id.index()]
    }

    /// Resets and rewires every connection for `settings`.
    ///
    /// The wet/dry gains jump straight to the configured mix; there is no
    /// signal on the new paths yet to smooth against. A stage that rejoins the
    /// processing order starts from silence rather than from whatever it held
    /// when it was bypassed.
    pub fn rebuild(&mut self, settings: &Settings) {
        for stage in &mut self.stages {
            stage.disconnect_all();
        }
        for edge in topology(settings).edges() {
            self.stage_mut(edge.from).connect(edge.to, edge.port);
        }

        let mix = settings.reverb_mix.clamp(0.0, 1.0);
        if let Some(dry) = self.param_mut(ParamId::DryGain) {
            dry.set_value(1.0 - mix);
        }
        if let Some(wet) = self.param_mut(ParamId::WetGain) {
            wet.set_value(mix);
        }

        if let Some(order) = execution_order(&self.edges()) {
            for &id in order.iter().filter(|id| !self.order.contains(id)) {
                self.stages[id.index()].clear_history();
            }
            self.order = order;
        }
        self.rebuilds += 1;
        log::debug!(
            "graph rebuilt: distortion={} tremolo={} reverb={} order={:?}",
            settings.distortion_enabled,
            settings.tremolo_enabled,
            settings.reverb_enabled,
            self.order
        );
    }

    /// Applies every parameter of `settings` immediately and rebuilds.
    pub fn apply(&mut self, settings: &Settings) {
        let settings = settings.sanitized();
        self.set_tone_shape(settings.tone_shape);
        self.set_distortion_drive(settings.distortion_drive);
        if let Processor::Modulator { lfo, .. } =
            &mut self.stage_mut(StageId::TremoloModulator).processor
        {
            lfo.rate.set_value(settings.tremolo_rate_hz);
            lfo.depth.set_value(settings.tremolo_depth);
        }
        if let Some(gain) = self.param_mut(ParamId::TremoloGain) {
            gain.set_value(tremolo_gate_gain(settings.tremolo_depth));
        }
        self.rebuild(&settings);
    }

    /// Number of rebuilds since construction, the initial one included.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Every live connection, read back from the stages themselves.
    pub fn edges(&self) -> Vec<Edge> {
        self.stages
            .iter()
            .flat_map(|stage| {
                stage.outputs().iter().map(move |&(to, port)| Edge {
                    from: stage.id(),
                    to,
                    port,
                })
            })
            .collect()
    }

    /// Live connections leaving `id`.
    pub fn outgoing(&self, id: StageId) -> &[(StageId, Port)] {
        self.stage(id).outputs()
    }

    /// Stages in the order they are processed.
    pub fn processing_order(&self) -> &[StageId] {
        &self.order
    }

    pub fn param(&self, id: ParamId) -> Option<&AudioParam> {
        self.stage(id.stage()).param()
    }

    pub fn param_mut(&mut self, id: ParamId) -> Option<&mut AudioParam> {
        self.stage_mut(id.stage()).param_mut()
    }

    pub fn set_tone_shape(&mut self, shape: crate::settings::ToneShape) {
        self.stage_mut(StageId::ToneSource)
            .configure(StageConfig::Waveform(shape));
    }

    /// Regenerates the distortion curve.
    pub fn set_distortion_drive(&mut self, drive: f64) {
        let curve = distortion_curve(drive, CURVE_RESOLUTION);
        self.stage_mut(StageId::DistortionShaper)
            .configure(StageConfig::Curve(curve));
    }

    pub fn set_tremolo_rate(&mut self, rate: f64, now: f64) {
        if let Processor::Modulator { lfo, .. } =
            &mut self.stage_mut(StageId::TremoloModulator).processor
        {
            lfo.rate.set_value_at_time(rate, now);
        }
    }

    /// Changes the modulation depth together with the gate gain it swings around.
    pub fn set_tremolo_depth(&mut self, depth: f64, now: f64) {
        if let Processor::Modulator { lfo, .. } =
            &mut self.stage_mut(StageId::TremoloModulator).processor
        {
            lfo.depth.set_value_at_time(depth, now);
        }
        if let Some(gain) = self.param_mut(ParamId::TremoloGain) {
            gain.set_value_at_time(tremolo_gate_gain(depth), now);
        }
    }

    /// Moves the wet/dry blend smoothly; the topology is left alone.
    pub fn set_reverb_mix(&mut self, mix: f64, now: f64) {
        let mix = mix.clamp(0.0, 1.0);
        if let Some(dry) = self.param_mut(ParamId::DryGain) {
            dry.cancel_scheduled_values(now);
            dry.set_target_at_time(1.0 - mix, now, MIX_TIME_CONSTANT);
        }
        if let Some(wet) = self.param_mut(ParamId::WetGain) {
            wet.cancel_scheduled_values(now);
            wet.set_target_at_time(mix, now, MIX_TIME_CONSTANT);
        }
    }

    pub fn analysis_tap(&self) -> Option<&AnalysisTap> {
        match &self.stage(StageId::AnalysisTap).processor {
            Processor::Tap(tap) => Some(tap),
            _ => None,
        }
    }

    pub fn analysis_tap_mut(&mut self) -> Option<&mut AnalysisTap> {
        match &mut self.stage_mut(StageId::AnalysisTap).processor {
            Processor::Tap(tap) => Some(tap),
            _ => None,
        }
    }

    /// Stops the tone source and the modulator. They cannot be restarted.
    pub fn stop_sources(&mut self) {
        self.stage_mut(StageId::ToneSource).stop();
        self.stage_mut(StageId::TremoloModulator).stop();
    }

    /// Renders one quantum of mono output into `out`.
    pub fn render_quantum(&mut self, start_time: f64, out: &mut [f64]) {
        debug_assert_eq!(out.len(), RENDER_QUANTUM);
        let quantum = Quantum {
            start_time,
            sample_rate: self.sample_rate,
        };

        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }

        for &id in &self.order {
            self.signal_in.fill(0.0);
            self.control_in.fill(0.0);
            for stage in &self.stages {
                for &(to, port) in stage.outputs() {
                    if to != id {
                        continue;
                    }
                    let source = &self.buffers[stage.id().index()];
                    let sink = match port {
                        Port::Signal => &mut self.signal_in,
                        Port::Control => &mut self.control_in,
                    };
                    for (acc, sample) in sink.iter_mut().zip(source) {
                        *acc += sample;
                    }
                }
            }

            let mut output = std::mem::take(&mut self.buffers[id.index()]);
            self.stages[id.index()].process(
                quantum,
                &self.signal_in,
                &self.control_in,
                &mut output,
            );
            self.buffers[id.index()] = output;
        }

        out.copy_from_slice(&self.buffers[StageId::Output.index()]);
    }
}

/// Topological order of the stages that can reach the output.
///
/// Returns `None` if the edges contain a cycle, which `topology` never
/// produces.
fn execution_order(edges: &[Edge]) -> Option<Vec<StageId>> {
    let mut graph = DiGraphMap::<StageId, Port>::new();
    for &id in StageId::ALL.iter() {
        graph.add_node(id);
    }
    for edge in edges {
        graph.add_edge(edge.from, edge.to, edge.port);
    }

    let mut reachable = Vec::new();
    let mut dfs = Dfs::new(Reversed(&graph), StageId::Output);
    while let Some(id) = dfs.next(Reversed(&graph)) {
        reachable.push(id);
    }

    match toposort(&graph, None) {
        Ok(order) => Some(
            order
                .into_iter()
                .filter(|id| reachable.contains(id))
                .collect(),
        ),
        Err(cycle) => {
            log::warn!("topology has a cycle through {:?}", cycle.node_id());
            None
        }
    }
}
