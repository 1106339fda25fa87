use crate::Signal;
use rand::Rng;
use rand::rngs::ThreadRng;

/// Uniform noise in `[-1, 1]`, the raw material of the reverb impulse.
///
/// Generic over the RNG so impulses can be made reproducible.
///
/// # Examples
///
/// ```
/// use theremin::{Signal, WhiteNoise};
/// use rand::SeedableRng;
///
/// let mut noise = WhiteNoise::with_rng(rand::rngs::StdRng::seed_from_u64(42));
/// assert!((-1.0..=1.0).contains(&noise.next_sample()));
/// ```
pub struct WhiteNoise<R: Rng = ThreadRng> {
    rng: R,
}

impl WhiteNoise<ThreadRng> {
    /// Noise from the thread-local RNG; differs on every run.
    pub fn new() -> Self {
        Self::with_rng(rand::thread_rng())
    }
}

impl Default for WhiteNoise<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> WhiteNoise<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Signal for WhiteNoise<R> {
    fn next_sample(&mut self) -> f64 {
        self.rng.gen_range(-1.0..=1.0)
    }
}
