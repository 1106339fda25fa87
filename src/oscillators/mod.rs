//! Oscillators for the tone source and the tremolo modulator.

mod tone;
mod traits;

pub use tone::ToneOscillator;
pub use traits::Oscillator;
