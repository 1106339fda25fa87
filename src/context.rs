//! Render clock and device lifecycle.

use crate::error::ThereminError;

/// Frames processed per render quantum.
///
/// Graph routing and parameter changes take effect at quantum boundaries.
pub const RENDER_QUANTUM: usize = 128;

/// Sample rates a context accepts, in Hz.
pub const MIN_SAMPLE_RATE: u32 = 3_000;
pub const MAX_SAMPLE_RATE: u32 = 768_000;

/// Output format of the audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub sample_rate: u32,
    /// Interleaved output channels; the mono graph output is copied to each
    pub channels: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not producing sound; the clock is frozen
    Suspended,
    Running,
    /// Torn down for good
    Closed,
}

/// The device context: format, lifecycle state and render clock.
#[derive(Debug)]
pub struct AudioContext {
    config: DeviceConfig,
    state: ContextState,
    frames: u64,
}

impl AudioContext {
    /// Creates a suspended context.
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` when the configuration cannot be rendered.
    pub fn new(config: DeviceConfig) -> Result<Self, ThereminError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&config.sample_rate) {
            return Err(ThereminError::DeviceUnavailable(format!(
                "sample rate {} Hz is outside {}..={} Hz",
                config.sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
            )));
        }
        if config.channels == 0 {
            return Err(ThereminError::DeviceUnavailable(
                "device reports no output channels".to_string(),
            ));
        }
        Ok(Self {
            config,
            state: ContextState::Suspended,
            frames: 0,
        })
    }

    pub fn config(&self) -> DeviceConfig {
        self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate as f64
    }

    pub fn channels(&self) -> usize {
        self.config.channels as usize
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Seconds of audio rendered so far.
    pub fn current_time(&self) -> f64 {
        self.frames as f64 / self.sample_rate()
    }

    /// Starts the clock. Returns false if the context is closed.
    pub fn resume(&mut self) -> bool {
        match self.state {
            ContextState::Closed => false,
            ContextState::Running => true,
            ContextState::Suspended => {
                log::info!("audio context resumed at {:.3}s", self.current_time());
                self.state = ContextState::Running;
                true
            }
        }
    }

    pub fn suspend(&mut self) {
        if self.state == ContextState::Running {
            self.state = ContextState::Suspended;
        }
    }

    /// Terminal. A closed context never runs again.
    pub fn close(&mut self) {
        if self.state != ContextState::Closed {
            log::info!("audio context closed at {:.3}s", self.current_time());
            self.state = ContextState::Closed;
        }
    }

    pub(crate) fn advance(&mut self, frames: usize) {
        self.frames += frames as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_sample_rate() {
        let config = DeviceConfig {
            sample_rate: 0,
            channels: 2,
        };
        assert!(matches!(
            AudioContext::new(config),
            Err(ThereminError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_rejects_zero_channels() {
        let config = DeviceConfig {
            sample_rate: 48000,
            channels: 0,
        };
        assert!(AudioContext::new(config).is_err());
    }

    #[test]
    fn test_lifecycle() {
        let mut context = AudioContext::new(DeviceConfig::default()).unwrap();
        assert_eq!(context.state(), ContextState::Suspended);
        assert!(context.resume());
        assert_eq!(context.state(), ContextState::Running);
        context.close();
        assert!(!context.resume());
        assert_eq!(context.state(), ContextState::Closed);
    }

    #[test]
    fn test_clock() {
        let mut context = AudioContext::new(DeviceConfig {
            sample_rate: 1000,
            channels: 1,
        })
        .unwrap();
        context.advance(250);
        assert_eq!(context.current_time(), 0.25);
    }
}
