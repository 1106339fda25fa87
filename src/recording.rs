//! Captured performances.

use crate::error::ThereminError;
use std::path::Path;

/// Mono audio captured from the analysis tap.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    sample_rate: u32,
    samples: Vec<f32>,
}

impl Recording {
    /// Wraps captured samples.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Rate the samples were rendered at, in Hz
    /// * `samples` - Mono samples in capture order
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Encodes the recording as a 32-bit float mono WAV file.
    #[cfg(feature = "wav")]
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<(), ThereminError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let storage = |e: hound::Error| ThereminError::Storage(e.to_string());
        let mut writer = hound::WavWriter::create(path.as_ref(), spec).map_err(storage)?;
        for &sample in &self.samples {
            writer.write_sample(sample).map_err(storage)?;
        }
        writer.finalize().map_err(storage)?;
        log::info!(
            "wrote {:.2}s recording to {}",
            self.duration_seconds(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Encoding is not compiled in; always fails.
    #[cfg(not(feature = "wav"))]
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<(), ThereminError> {
        Err(ThereminError::RecordingUnsupported(format!(
            "cannot write {}: built without the `wav` feature",
            path.as_ref().display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let recording = Recording::new(100, vec![0.0; 250]);
        assert_eq!(recording.duration_seconds(), 2.5);
        assert_eq!(Recording::new(0, vec![0.0; 4]).duration_seconds(), 0.0);
    }

    #[cfg(not(feature = "wav"))]
    #[test]
    fn test_write_wav_unsupported() {
        let recording = Recording::new(100, vec![0.0; 4]);
        assert!(matches!(
            recording.write_wav("out.wav"),
            Err(ThereminError::RecordingUnsupported(_))
        ));
    }

    #[cfg(feature = "wav")]
    #[test]
    fn test_write_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        let recording = Recording::new(8000, vec![0.0, 0.5, -0.5, 0.25]);
        recording.write_wav(&path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, recording.samples());
    }
}
