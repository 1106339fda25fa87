//! Multi-shape oscillator used by the tone source.

use super::Oscillator;
use crate::Signal;
use crate::settings::ToneShape;
use std::f64::consts::PI;

/// An oscillator whose waveform can be switched while it runs.
///
/// Phase is kept across shape and frequency changes, so switching never
/// restarts the cycle. Square and sawtooth use PolyBLEP correction to keep
/// aliasing down at high pitches.
#[derive(Debug, Clone)]
pub struct ToneOscillator {
    /// Position in the cycle, in `[0, 1)`
    phase: f64,
    phase_increment: f64,
    sample_rate: f64,
    shape: ToneShape,
}

impl ToneOscillator {
    /// Creates a new oscillator.
    ///
    /// # Examples
    ///
    /// ```
    /// use theremin::{Signal, ToneOscillator, ToneShape};
    ///
    /// let mut osc = ToneOscillator::new(ToneShape::Triangle, 440.0, 44100.0);
    /// let sample = osc.next_sample();
    /// assert!((sample + 1.0).abs() < 0.01);
    /// ```
    pub fn new(shape: ToneShape, frequency: f64, sample_rate: f64) -> Self {
        Self {
            phase: 0.0,
            phase_increment: frequency / sample_rate,
            sample_rate,
            shape,
        }
    }

    pub fn shape(&self) -> ToneShape {
        self.shape
    }

    /// Switches the waveform without touching the phase.
    pub fn set_shape(&mut self, shape: ToneShape) {
        self.shape = shape;
    }
}

/// PolyBLEP residual for a discontinuity at phase 0/1.
fn poly_blep(phase: f64, increment: f64) -> f64 {
    if increment <= 0.0 {
        0.0
    } else if phase < increment {
        let t = phase / increment;
        2.0 * t - t * t - 1.0
    } else if phase > 1.0 - increment {
        let t = (phase - 1.0) / increment;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

impl Signal for ToneOscillator {
    fn next_sample(&mut self) -> f64 {
        let phase = self.phase;
        let increment = self.phase_increment.abs();
        let sample = match self.shape {
            ToneShape::Sine => (phase * 2.0 * PI).sin(),
            ToneShape::Square => {
                let naive = if phase < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(phase, increment) - poly_blep((phase + 0.5) % 1.0, increment)
            }
            ToneShape::Sawtooth => 2.0 * phase - 1.0 - poly_blep(phase, increment),
            ToneShape::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
        };

        self.phase = (self.phase + self.phase_increment).rem_euclid(1.0);

        sample
    }
}

impl Oscillator for ToneOscillator {
    fn set_frequency(&mut self, frequency: f64) {
        self.phase_increment = frequency / self.sample_rate;
    }

    fn frequency(&self) -> f64 {
        self.phase_increment * self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_change() {
        let mut osc = ToneOscillator::new(ToneShape::Sine, 440.0, 44100.0);
        assert_eq!(osc.frequency(), 440.0);
        osc.set_frequency(880.0);
        assert_eq!(osc.frequency(), 880.0);
    }

    #[test]
    fn test_sample_range() {
        for shape in ToneShape::ALL {
            let mut osc = ToneOscillator::new(shape, 1234.0, 44100.0);
            for _ in 0..44100 {
                let sample = osc.next_sample();
                assert!((-1.0..=1.0).contains(&sample), "{:?} gave {}", shape, sample);
            }
        }
    }

    #[test]
    fn test_sine_quarter_period() {
        let mut osc = ToneOscillator::new(ToneShape::Sine, 1.0, 4.0);
        assert!(osc.next_sample().abs() < 1e-12);
        assert!((osc.next_sample() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_square_duty_cycle() {
        let mut osc = ToneOscillator::new(ToneShape::Square, 100.0, 44100.0);
        let positive = (0..44100).filter(|_| osc.next_sample() > 0.0).count();
        assert!((positive as f64 / 44100.0 - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_shape_switch_keeps_phase() {
        let mut osc = ToneOscillator::new(ToneShape::Triangle, 1.0, 100.0);
        for _ in 0..25 {
            osc.next_sample();
        }
        osc.set_shape(ToneShape::Sine);
        // Phase 0.25 on a sine is the positive peak
        assert!((osc.next_sample() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_phase_wrapping() {
        let mut osc = ToneOscillator::new(ToneShape::Sawtooth, 3000.0, 44100.0);
        for _ in 0..100000 {
            osc.next_sample();
        }
        assert!(osc.phase >= 0.0 && osc.phase < 1.0);
    }
}
