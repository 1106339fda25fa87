/// A per-sample generator.
///
/// Oscillators and noise sources implement this; graph stages pull from
/// them one render quantum at a time.
///
/// # Examples
///
/// ```
/// use theremin::{Signal, ToneOscillator, ToneShape};
///
/// let mut osc = ToneOscillator::new(ToneShape::Square, 100.0, 8000.0);
/// let mut block = [0.0; 128];
/// osc.process(&mut block);
/// assert!(block.iter().all(|s| s.abs() <= 1.0 + 1e-9));
/// ```
pub trait Signal {
    fn next_sample(&mut self) -> f64;

    /// Fills `buffer` with consecutive samples.
    fn process(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }
}
