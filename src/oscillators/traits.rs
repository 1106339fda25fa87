/// Periodic sources whose pitch can be retuned while running.
///
/// Retuning never resets the phase, so a frequency glide stays continuous.
pub trait Oscillator {
    /// Sets the frequency in Hz, applied from the next sample.
    fn set_frequency(&mut self, frequency: f64);

    fn frequency(&self) -> f64;
}
