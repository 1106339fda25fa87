//! Signal processing types and traits.
//!
//! This module provides the core abstractions shared by every stage:
//! - `Signal` trait for per-sample generators (oscillators, noise)
//! - `AudioParam` for time-automated stage parameters

mod param;
mod signal;

pub use param::AudioParam;
pub use signal::Signal;
