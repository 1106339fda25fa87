//! Signal stages: one processing unit each, with a uniform contract.

use super::analyser::AnalysisTap;
use crate::effects::{Convolver, ImpulseResponse, TremoloModulator, WaveShaper};
use crate::oscillators::{Oscillator, ToneOscillator};
use crate::settings::ToneShape;
use crate::{AudioParam, Signal};

/// Every stage in the graph. The set is fixed for the lifetime of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    ToneSource,
    /// Main volume gate controlled by the player's x position
    AmplitudeGate,
    DistortionShaper,
    /// Intermediate gate whose gain the tremolo modulator drives
    TremoloGate,
    TremoloModulator,
    ReverbUnit,
    DryGain,
    WetGain,
    AnalysisTap,
    /// The device output
    Output,
}

impl StageId {
    pub const ALL: [StageId; 10] = [
        StageId::ToneSource,
        StageId::AmplitudeGate,
        StageId::DistortionShaper,
        StageId::TremoloGate,
        StageId::TremoloModulator,
        StageId::ReverbUnit,
        StageId::DryGain,
        StageId::WetGain,
        StageId::AnalysisTap,
        StageId::Output,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Which input of the target stage an edge feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Port {
    /// The audio input
    Signal,
    /// The gain parameter of an amplitude gate
    Control,
}

/// A directed connection between two stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub from: StageId,
    pub to: StageId,
    pub port: Port,
}

impl Edge {
    pub fn signal(from: StageId, to: StageId) -> Self {
        Self {
            from,
            to,
            port: Port::Signal,
        }
    }

    pub fn control(from: StageId, to: StageId) -> Self {
        Self {
            from,
            to,
            port: Port::Control,
        }
    }
}

/// Static parameters a stage can be configured with.
pub enum StageConfig {
    Waveform(ToneShape),
    Curve(Vec<f64>),
    Impulse(ImpulseResponse),
}

/// Timing of the render quantum being processed.
#[derive(Debug, Clone, Copy)]
pub struct Quantum {
    pub start_time: f64,
    pub sample_rate: f64,
}

pub(crate) enum Processor {
    Tone {
        oscillator: ToneOscillator,
        frequency: AudioParam,
        running: bool,
    },
    Gate {
        gain: AudioParam,
    },
    Shaper(WaveShaper),
    Modulator {
        lfo: TremoloModulator,
        running: bool,
    },
    Reverb(Convolver),
    Tap(AnalysisTap),
    Output,
}

pub struct Stage {
    id: StageId,
    pub(crate) processor: Processor,
    outputs: Vec<(StageId, Port)>,
    scratch: Vec<f64>,
}

impl Stage {
    pub(crate) fn new(id: StageId, processor: Processor) -> Self {
        Self {
            id,
            processor,
            outputs: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    /// Current outgoing connections.
    pub fn outputs(&self) -> &[(StageId, Port)] {
        &self.outputs
    }

    /// Adds an outgoing edge.
    ///
    /// Self-connections and duplicates are refused; the return value says
    /// whether the edge was added.
    pub fn connect(&mut self, target: StageId, port: Port) -> bool {
        if target == self.id {
            log::warn!("refusing to connect {:?} to itself", self.id);
            return false;
        }
        if self.outputs.contains(&(target, port)) {
            return false;
        }
        self.outputs.push((target, port));
        true
    }

    /// Removes every outgoing edge. Safe on a stage with none.
    pub fn disconnect_all(&mut self) {
        self.outputs.clear();
    }

    /// Applies static parameters. Configuration a stage has no use for is
    /// ignored with a warning.
    pub fn configure(&mut self, config: StageConfig) {
        match (&mut self.processor, config) {
            (Processor::Tone { oscillator, .. }, StageConfig::Waveform(shape)) => {
                oscillator.set_shape(shape)
            }
            (Processor::Shaper(shaper), StageConfig::Curve(curve)) => shaper.set_curve(curve),
            (Processor::Reverb(convolver), StageConfig::Impulse(impulse)) => {
                *convolver = Convolver::from_impulse(&impulse, convolver.block_size())
            }
            _ => log::warn!("{:?} does not accept this configuration", self.id),
        }
    }

    /// The automatable parameter of this stage, if it has one.
    ///
    /// That is the frequency of the tone source and the gain of every gate.
    /// Other stages return `None`.
    pub fn param_mut(&mut self) -> Option<&mut AudioParam> {
        match &mut self.processor {
            Processor::Tone { frequency, .. } => Some(frequency),
            Processor::Gate { gain } => Some(gain),
            _ => None,
        }
    }

    /// Read-only view of the stage's parameter; see [`Stage::param_mut`].
    pub fn param(&self) -> Option<&AudioParam> {
        match &self.processor {
            Processor::Tone { frequency, .. } => Some(frequency),
            Processor::Gate { gain } => Some(gain),
            _ => None,
        }
    }

    /// Drops whatever the stage remembers of earlier input.
    ///
    /// Only the reverb carries such state; everything else is unaffected.
    pub(crate) fn clear_history(&mut self) {
        if let Processor::Reverb(convolver) = &mut self.processor {
            convolver.reset();
        }
    }

    /// Stops oscillator-type stages for good; they render silence afterwards.
    pub(crate) fn stop(&mut self) {
        match &mut self.processor {
            Processor::Tone { running, .. } | Processor::Modulator { running, .. } => {
                *running = false
            }
            _ => {}
        }
    }

    /// Processes one quantum.
    ///
    /// `signal` is the sum of everything wired to the audio input, `control`
    /// the sum of everything wired to the control input.
    pub(crate) fn process(
        &mut self,
        quantum: Quantum,
        signal: &[f64],
        control: &[f64],
        output: &mut [f64],
    ) {
        let Quantum {
            start_time,
            sample_rate,
        } = quantum;
        self.scratch.resize(output.len(), 0.0);
        match &mut self.processor {
            Processor::Tone {
                oscillator,
                frequency,
                running,
            } => {
                if !*running {
                    output.fill(0.0);
                    return;
                }
                frequency.fill(start_time, sample_rate, &mut self.scratch);
                for (out, &hz) in output.iter_mut().zip(&self.scratch) {
                    oscillator.set_frequency(hz);
                    *out = oscillator.next_sample();
                }
            }
            Processor::Gate { gain } => {
                gain.fill(start_time, sample_rate, &mut self.scratch);
                for (i, out) in output.iter_mut().enumerate() {
                    *out = signal[i] * (self.scratch[i] + control[i]);
                }
            }
            Processor::Shaper(shaper) => shaper.process(signal, output),
            Processor::Modulator { lfo, running } => {
                if *running {
                    lfo.render(start_time, output);
                } else {
                    output.fill(0.0);
                }
            }
            Processor::Reverb(convolver) => convolver.process(signal, output),
            Processor::Tap(tap) => tap.process(signal, output),
            Processor::Output => output.copy_from_slice(signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(id: StageId, gain: f64) -> Stage {
        Stage::new(
            id,
            Processor::Gate {
                gain: AudioParam::new(gain, 0.0, 10.0),
            },
        )
    }

    #[test]
    fn test_connect_refuses_self_and_duplicates() {
        let mut stage = gate(StageId::DryGain, 1.0);
        assert!(!stage.connect(StageId::DryGain, Port::Signal));
        assert!(stage.connect(StageId::AnalysisTap, Port::Signal));
        assert!(!stage.connect(StageId::AnalysisTap, Port::Signal));
        assert_eq!(stage.outputs().len(), 1);
    }

    #[test]
    fn test_disconnect_all_is_idempotent() {
        let mut stage = gate(StageId::DryGain, 1.0);
        stage.disconnect_all();
        stage.connect(StageId::AnalysisTap, Port::Signal);
        stage.disconnect_all();
        stage.disconnect_all();
        assert!(stage.outputs().is_empty());
    }

    #[test]
    fn test_gate_adds_control_to_gain() {
        let mut stage = gate(StageId::TremoloGate, 0.75);
        let quantum = Quantum {
            start_time: 0.0,
            sample_rate: 100.0,
        };
        let mut output = [0.0; 2];
        stage.process(quantum, &[1.0, 1.0], &[0.25, -0.25], &mut output);
        assert_eq!(output, [1.0, 0.5]);
    }

    #[test]
    fn test_stopped_tone_is_silent() {
        let mut stage = Stage::new(
            StageId::ToneSource,
            Processor::Tone {
                oscillator: ToneOscillator::new(ToneShape::Square, 440.0, 44100.0),
                frequency: AudioParam::new(440.0, 0.0, 22050.0),
                running: true,
            },
        );
        stage.stop();
        let quantum = Quantum {
            start_time: 0.0,
            sample_rate: 44100.0,
        };
        let mut output = [1.0; 4];
        stage.process(quantum, &[0.0; 4], &[0.0; 4], &mut output);
        assert_eq!(output, [0.0; 4]);
    }

    #[test]
    fn test_configure_ignores_mismatch() {
        let mut stage = gate(StageId::AmplitudeGate, 0.5);
        stage.configure(StageConfig::Curve(vec![0.0, 1.0]));
        assert_eq!(stage.param().map(AudioParam::value), Some(0.5));
    }
}
