//! Audio effects for the theremin's signal chain.
//!
//! Each effect here is a plain DSP processor. The graph stages in
//! `crate::graph` own them and decide how they are wired together.

mod distortion;
mod reverb;
mod tremolo;

pub use distortion::{CURVE_RESOLUTION, WaveShaper, distortion_curve};
pub use reverb::{
    Convolver, IMPULSE_CHANNELS, IMPULSE_SECONDS, ImpulseResponse, impulse_response,
    impulse_response_with_rng,
};
pub use tremolo::{TremoloModulator, tremolo_gate_gain};
