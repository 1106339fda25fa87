//! Tremolo modulation source.

use crate::oscillators::{Oscillator, ToneOscillator};
use crate::settings::ToneShape;
use crate::{AudioParam, Signal};

/// Intrinsic gain of the amplitude gate that carries the tremolo.
///
/// The modulator adds `depth/2 * lfo` on top of this through the gate's
/// control input, so the effective gain is
/// `1 + depth/2 * (lfo - 1)`: it swings between `1 - depth` and `1`.
/// At depth 0.0 the gate is transparent.
pub fn tremolo_gate_gain(depth: f64) -> f64 {
    1.0 - depth.clamp(0.0, 1.0) / 2.0
}

/// Low-frequency sine oscillator that drives a gate's control input.
///
/// Its output is already scaled by half the depth, so it can be summed
/// straight into the gain of the tremolo gate.
///
/// # Examples
///
/// ```
/// use theremin::TremoloModulator;
///
/// let mut lfo = TremoloModulator::new(5.0, 0.5, 44100.0);
/// let mut block = [0.0; 128];
/// lfo.render(0.0, &mut block);
/// assert!(block.iter().all(|v| v.abs() <= 0.25));
/// ```
pub struct TremoloModulator {
    lfo: ToneOscillator,
    sample_rate: f64,
    /// LFO rate in Hz
    pub rate: AudioParam,
    /// Modulation depth (0.0 = no effect, 1.0 = full tremolo)
    pub depth: AudioParam,
    rate_scratch: Vec<f64>,
    depth_scratch: Vec<f64>,
}

impl TremoloModulator {
    /// Creates a modulator.
    ///
    /// # Arguments
    ///
    /// * `rate` - LFO frequency in Hz
    /// * `depth` - Modulation depth from 0.0 to 1.0
    /// * `sample_rate` - Audio sample rate in Hz
    ///
    /// # Examples
    ///
    /// ```
    /// use theremin::TremoloModulator;
    ///
    /// let mut lfo = TremoloModulator::new(5.0, 1.0, 8000.0);
    /// let mut control = vec![0.0; 128];
    /// lfo.render(0.0, &mut control);
    /// assert!(control.iter().all(|c| c.abs() <= 0.5));
    /// ```
    pub fn new(rate: f64, depth: f64, sample_rate: f64) -> Self {
        Self {
            lfo: ToneOscillator::new(ToneShape::Sine, rate, sample_rate),
            sample_rate,
            rate: AudioParam::new(rate, 0.0, sample_rate / 2.0),
            depth: AudioParam::new(depth, 0.0, 1.0),
            rate_scratch: Vec::new(),
            depth_scratch: Vec::new(),
        }
    }

    /// Renders one block of control signal starting at `start_time`.
    pub fn render(&mut self, start_time: f64, out: &mut [f64]) {
        self.rate_scratch.resize(out.len(), 0.0);
        self.depth_scratch.resize(out.len(), 0.0);
        self.rate
            .fill(start_time, self.sample_rate, &mut self.rate_scratch);
        self.depth
            .fill(start_time, self.sample_rate, &mut self.depth_scratch);
        for (i, slot) in out.iter_mut().enumerate() {
            self.lfo.set_frequency(self.rate_scratch[i]);
            *slot = self.lfo.next_sample() * self.depth_scratch[i] / 2.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_gain_range() {
        assert_eq!(tremolo_gate_gain(0.0), 1.0);
        assert_eq!(tremolo_gate_gain(1.0), 0.5);
        assert_eq!(tremolo_gate_gain(0.5), 0.75);
    }

    #[test]
    fn test_effective_gain_spans_one_minus_depth_to_one() {
        let depth = 0.8;
        let mut lfo = TremoloModulator::new(10.0, depth, 1000.0);
        let mut block = vec![0.0; 1000];
        lfo.render(0.0, &mut block);
        let base = tremolo_gate_gain(depth);
        let min = block.iter().map(|m| base + m).fold(f64::MAX, f64::min);
        let max = block.iter().map(|m| base + m).fold(f64::MIN, f64::max);
        assert!((min - (1.0 - depth)).abs() < 1e-3);
        assert!((max - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_depth_is_silent() {
        let mut lfo = TremoloModulator::new(5.0, 0.0, 44100.0);
        let mut block = [1.0; 64];
        lfo.render(0.0, &mut block);
        assert!(block.iter().all(|&v| v == 0.0));
    }
}
