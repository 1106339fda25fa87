//! Synthetic impulse responses and FFT convolution for the reverb unit.

use crate::{Signal, WhiteNoise};
use rand::Rng;
use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Length of the generated reverb tail in seconds.
pub const IMPULSE_SECONDS: f64 = 2.0;
/// Channel count of the generated impulse response.
pub const IMPULSE_CHANNELS: usize = 2;

/// Normalisation constants matching browser convolvers.
const GAIN_CALIBRATION_DB: f64 = -58.0;
const GAIN_CALIBRATION_SAMPLE_RATE: f64 = 44100.0;
const MIN_POWER: f64 = 0.000125;

/// A multi-channel buffer characterising a reverberant space.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl ImpulseResponse {
    /// Wraps existing channel data. All channels must be the same length.
    pub fn from_channels(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        debug_assert!(channels.windows(2).all(|w| w[0].len() == w[1].len()));
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Single kernel equal to the mean of all channels.
    ///
    /// Convolving a mono signal with each channel and averaging the results
    /// is the same as convolving once with this kernel.
    pub fn downmix(&self) -> Vec<f64> {
        let count = self.channels.len().max(1) as f64;
        (0..self.len())
            .map(|i| self.channels.iter().map(|c| c[i] as f64).sum::<f64>() / count)
            .collect()
    }

    /// Scale that brings the response to a consistent loudness.
    pub fn normalization_scale(&self) -> f64 {
        let frames = self.len() * self.channel_count();
        let power = if frames == 0 {
            0.0
        } else {
            let energy: f64 = self
                .channels
                .iter()
                .flat_map(|c| c.iter())
                .map(|&s| (s as f64) * (s as f64))
                .sum();
            (energy / frames as f64).sqrt()
        };
        let power = if power.is_finite() && power >= MIN_POWER {
            power
        } else {
            MIN_POWER
        };
        let mut scale = 1.0 / power;
        scale *= 10f64.powf(GAIN_CALIBRATION_DB * 0.05);
        if self.sample_rate > 0 {
            scale *= GAIN_CALIBRATION_SAMPLE_RATE / self.sample_rate as f64;
        }
        scale
    }
}

/// Generates a decaying noise burst with the thread RNG.
///
/// Each sample is `U(-1, 1) * (1 - i/N)^2`, so every run produces a different
/// tail.
pub fn impulse_response(
    duration_seconds: f64,
    sample_rate: u32,
    channels: usize,
) -> ImpulseResponse {
    impulse_response_with_rng(duration_seconds, sample_rate, channels, rand::thread_rng())
}

/// Like `impulse_response` but draws from the given RNG.
///
/// # Examples
///
/// ```
/// use theremin::impulse_response_with_rng;
/// use rand::SeedableRng;
///
/// let rng = rand::rngs::StdRng::seed_from_u64(1);
/// let ir = impulse_response_with_rng(0.5, 8000, 2, rng);
/// assert_eq!(ir.len(), 4000);
/// assert_eq!(ir.channel_count(), 2);
/// ```
pub fn impulse_response_with_rng<R: Rng>(
    duration_seconds: f64,
    sample_rate: u32,
    channels: usize,
    rng: R,
) -> ImpulseResponse {
    let length = (duration_seconds.max(0.0) * sample_rate as f64) as usize;
    let mut noise = WhiteNoise::with_rng(rng);
    let channels = (0..channels)
        .map(|_| {
            (0..length)
                .map(|i| {
                    let decay = (1.0 - i as f64 / length as f64).powi(2);
                    (noise.next_sample() * decay) as f32
                })
                .collect()
        })
        .collect();
    ImpulseResponse::from_channels(sample_rate, channels)
}

/// Uniformly partitioned overlap-save convolution.
///
/// The kernel is split into partitions of `block_size` frames whose spectra
/// are computed once. Each call to `process` consumes exactly one block and
/// produces one block, with no latency beyond the block itself.
pub struct Convolver {
    block_size: usize,
    r2c: Arc<dyn RealToComplex<f64>>,
    c2r: Arc<dyn ComplexToReal<f64>>,
    partitions: Vec<Vec<Complex<f64>>>,
    /// Spectra of recent input windows, newest at `head`
    history: Vec<Vec<Complex<f64>>>,
    head: usize,
    window: Vec<f64>,
    time_scratch: Vec<f64>,
    accumulator: Vec<Complex<f64>>,
}

impl Convolver {
    /// Prepares a convolver for `kernel`, already scaled as desired.
    pub fn new(kernel: &[f64], block_size: usize) -> Self {
        let fft_size = block_size * 2;
        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(fft_size);
        let c2r = planner.plan_fft_inverse(fft_size);

        let partitions: Vec<Vec<Complex<f64>>> = kernel
            .chunks(block_size)
            .map(|chunk| {
                let mut padded = vec![0.0; fft_size];
                padded[..chunk.len()].copy_from_slice(chunk);
                let mut spectrum = r2c.make_output_vec();
                if let Err(e) = r2c.process(&mut padded, &mut spectrum) {
                    log::warn!("reverb kernel transform failed: {}", e);
                }
                spectrum
            })
            .collect();
        let history = vec![r2c.make_output_vec(); partitions.len().max(1)];

        Self {
            block_size,
            accumulator: r2c.make_output_vec(),
            r2c,
            c2r,
            partitions,
            history,
            head: 0,
            window: vec![0.0; fft_size],
            time_scratch: vec![0.0; fft_size],
        }
    }

    /// Builds a convolver from an impulse response, downmixed and normalised.
    pub fn from_impulse(impulse: &ImpulseResponse, block_size: usize) -> Self {
        let scale = impulse.normalization_scale();
        let kernel: Vec<f64> = impulse.downmix().into_iter().map(|s| s * scale).collect();
        Self::new(&kernel, block_size)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Forgets all past input, as if only silence had ever been processed.
    pub fn reset(&mut self) {
        for spectrum in &mut self.history {
            spectrum.fill(Complex::new(0.0, 0.0));
        }
        self.window.fill(0.0);
        self.head = 0;
    }

    /// Convolves one block. Both slices must be `block_size` long.
    pub fn process(&mut self, input: &[f64], output: &mut [f64]) {
        let block = self.block_size;
        debug_assert_eq!(input.len(), block);
        debug_assert_eq!(output.len(), block);

        if self.partitions.is_empty() {
            output.fill(0.0);
            return;
        }

        self.window.copy_within(block.., 0);
        self.window[block..].copy_from_slice(input);
        self.time_scratch.copy_from_slice(&self.window);
        if let Err(e) = self
            .r2c
            .process(&mut self.time_scratch, &mut self.history[self.head])
        {
            log::warn!("reverb forward transform failed: {}", e);
            output.fill(0.0);
            return;
        }

        let count = self.partitions.len();
        self.accumulator.fill(Complex::new(0.0, 0.0));
        for (p, partition) in self.partitions.iter().enumerate() {
            let spectrum = &self.history[(self.head + count - p) % count];
            for ((acc, x), h) in self.accumulator.iter_mut().zip(spectrum).zip(partition) {
                *acc += x * h;
            }
        }
        self.head = (self.head + 1) % count;

        // The inverse transform requires purely real DC and Nyquist bins
        let last = self.accumulator.len() - 1;
        self.accumulator[0].im = 0.0;
        self.accumulator[last].im = 0.0;
        if let Err(e) = self
            .c2r
            .process(&mut self.accumulator, &mut self.time_scratch)
        {
            log::warn!("reverb inverse transform failed: {}", e);
            output.fill(0.0);
            return;
        }

        let scale = 1.0 / (2 * block) as f64;
        for (out, &sample) in output.iter_mut().zip(&self.time_scratch[block..]) {
            *out = sample * scale;
        }
    }
}
