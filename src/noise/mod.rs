//! Noise generators.
//!
//! White noise is the raw material of the synthetic reverb impulse response.

mod white;

pub use white::WhiteNoise;
