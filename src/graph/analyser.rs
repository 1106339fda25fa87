//! The analysis tap: a pass-through monitoring point.
//!
//! Keeps the most recent `fft_size` samples for visualisation and optionally
//! captures everything that passes for recording. Snapshots are pulled by the
//! caller; nothing is pushed.

use crate::error::ThereminError;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::f64::consts::PI;
use std::sync::Arc;

pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32768;
pub const DEFAULT_SMOOTHING: f64 = 0.8;
pub const DEFAULT_MIN_DECIBELS: f64 = -100.0;
pub const DEFAULT_MAX_DECIBELS: f64 = -30.0;

pub struct AnalysisTap {
    fft_size: usize,
    ring: Vec<f32>,
    write: usize,
    smoothing: f64,
    min_decibels: f64,
    max_decibels: f64,
    magnitudes: Vec<f64>,
    fft: Arc<dyn RealToComplex<f64>>,
    capture: Option<Vec<f32>>,
}

impl AnalysisTap {
    /// A pass-through tap with a 2048-point analysis window, not capturing.
    pub fn new() -> Self {
        Self::with_fft_size(DEFAULT_FFT_SIZE)
    }

    fn with_fft_size(fft_size: usize) -> Self {
        Self {
            fft_size,
            ring: vec![0.0; fft_size],
            write: 0,
            smoothing: DEFAULT_SMOOTHING,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
            magnitudes: vec![0.0; fft_size / 2],
            fft: RealFftPlanner::<f64>::new().plan_fft_forward(fft_size),
            capture: None,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins returned by the frequency snapshots.
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Changes the analysis window. Out-of-range sizes are clamped and rounded
    /// up to a power of two; history is cleared.
    pub fn set_fft_size(&mut self, size: usize) {
        let clamped = size.clamp(MIN_FFT_SIZE, MAX_FFT_SIZE).next_power_of_two();
        if clamped != size {
            log::warn!(
                "{}",
                ThereminError::InvalidParameter(format!(
                    "fft size {} must be a power of two in {}..={}, using {}",
                    size, MIN_FFT_SIZE, MAX_FFT_SIZE, clamped
                ))
            );
        }
        let capture = self.capture.take();
        let smoothing = self.smoothing;
        *self = Self::with_fft_size(clamped);
        self.smoothing = smoothing;
        self.capture = capture;
    }

    /// Averaging constant applied between successive frequency snapshots.
    pub fn set_smoothing(&mut self, smoothing: f64) {
        self.smoothing = crate::error::clamp_param("smoothing", smoothing, 0.0, 1.0);
    }

    /// Copies `input` to `output` and records it.
    pub fn process(&mut self, input: &[f64], output: &mut [f64]) {
        output.copy_from_slice(input);
        for &sample in input {
            self.ring[self.write] = sample as f32;
            self.write = (self.write + 1) % self.fft_size;
        }
        if let Some(capture) = self.capture.as_mut() {
            capture.extend(input.iter().map(|&s| s as f32));
        }
    }

    /// The last `fft_size` samples, oldest first.
    pub fn time_domain_data(&self) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.fft_size);
        data.extend_from_slice(&self.ring[self.write..]);
        data.extend_from_slice(&self.ring[..self.write]);
        data
    }

    /// Time-domain snapshot scaled to bytes, 128 being silence.
    pub fn byte_time_domain_data(&self) -> Vec<u8> {
        self.time_domain_data()
            .into_iter()
            .map(|s| (128.0 * (1.0 + s as f64)).clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Smoothed magnitude spectrum in decibels, one value per bin.
    ///
    /// Each call folds the current window into the running average, so the
    /// result depends on how often it is polled.
    pub fn frequency_data(&mut self) -> Vec<f32> {
        let n = self.fft_size;
        let mut windowed: Vec<f64> = self
            .time_domain_data()
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                let x = i as f64 / n as f64;
                let blackman = 0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos();
                s as f64 * blackman
            })
            .collect();
        let mut spectrum = self.fft.make_output_vec();
        if let Err(e) = self.fft.process(&mut windowed, &mut spectrum) {
            log::warn!("analysis transform failed: {}", e);
            spectrum.fill(Complex::new(0.0, 0.0));
        }

        let smoothing = self.smoothing;
        self.magnitudes
            .iter_mut()
            .zip(&spectrum)
            .map(|(previous, bin)| {
                let magnitude = bin.norm() / n as f64;
                *previous = smoothing * *previous + (1.0 - smoothing) * magnitude;
                if *previous > 0.0 {
                    (20.0 * previous.log10()) as f32
                } else {
                    f32::NEG_INFINITY
                }
            })
            .collect()
    }

    /// Frequency snapshot mapped from `[min_decibels, max_decibels]` to bytes.
    pub fn byte_frequency_data(&mut self) -> Vec<u8> {
        let range = self.max_decibels - self.min_decibels;
        let min = self.min_decibels;
        self.frequency_data()
            .into_iter()
            .map(|db| (255.0 * (db as f64 - min) / range).clamp(0.0, 255.0) as u8)
            .collect()
    }

    pub fn start_capture(&mut self) -> bool {
        if self.capture.is_some() {
            return false;
        }
        self.capture = Some(Vec::new());
        true
    }

    pub fn stop_capture(&mut self) -> Option<Vec<f32>> {
        self.capture.take()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }
}

impl Default for AnalysisTap {
    fn default() -> Self {
        Self::new()
    }
}
