//! Theremin - a pointer-played synthesizer built around a rewirable signal graph
//!
//! The pointer's height sets the pitch and its horizontal position the
//! loudness. Effects (distortion, tremolo, reverb) are switched in and out by
//! rewiring a fixed set of stages; their parameters are smoothed so nothing
//! clicks while the instrument is sounding.

pub mod binding;
pub mod context;
pub mod controller;
pub mod effects;
pub mod engine;
pub mod error;
pub mod graph;
pub mod noise;
pub mod oscillators;
#[cfg(feature = "playback")]
pub mod playback;
pub mod presets;
pub mod recording;
pub mod scheduler;
pub mod settings;
pub mod signals;

// Re-export commonly used types at the crate root
pub use binding::{ControlBinding, NullBinding};
pub use context::{AudioContext, ContextState, DeviceConfig, RENDER_QUANTUM};
pub use controller::{
    MAX_FREQUENCY, MIN_FREQUENCY, PerformanceController, PlayState, Surface, amplitude_for,
    frequency_for,
};
pub use effects::{
    Convolver, ImpulseResponse, TremoloModulator, WaveShaper, distortion_curve, impulse_response,
    impulse_response_with_rng,
};
pub use engine::ThereminEngine;
pub use error::ThereminError;
pub use graph::{AnalysisTap, Edge, ParamId, Port, SignalGraph, StageId, topology};
pub use noise::WhiteNoise;
pub use oscillators::{Oscillator, ToneOscillator};
#[cfg(feature = "playback")]
pub use playback::Playback;
pub use presets::{FileStorage, MemoryStorage, PresetStorage, PresetStore};
pub use recording::Recording;
pub use settings::{Settings, ToneShape};
pub use signals::{AudioParam, Signal};
