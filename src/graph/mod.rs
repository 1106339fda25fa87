//! The processing graph: stages, their topology and the manager that owns them.

mod analyser;
mod manager;
mod stage;
mod topology;

pub use analyser::{
    AnalysisTap, DEFAULT_FFT_SIZE, DEFAULT_MAX_DECIBELS, DEFAULT_MIN_DECIBELS, DEFAULT_SMOOTHING,
    MAX_FFT_SIZE, MIN_FFT_SIZE,
};
pub use manager::{MIX_TIME_CONSTANT, ParamId, SignalGraph};
pub use stage::{Edge, Port, Quantum, Stage, StageConfig, StageId};
pub use topology::{Topology, topology};
