use std::fmt;

/// Error type for everything the theremin engine can report.
///
/// Only `DeviceUnavailable` is fatal. The remaining kinds are recovered
/// locally by the engine and surfaced through the control binding as
/// warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThereminError {
    /// The audio subsystem could not be created or opened
    DeviceUnavailable(String),
    /// A preset with this name does not exist
    PresetNotFound(String),
    /// Recording or encoding is not available on this build/platform
    RecordingUnsupported(String),
    /// A setter received a value outside its domain
    InvalidParameter(String),
    /// A persistence collaborator (preset store, recording file) failed
    Storage(String),
}

impl fmt::Display for ThereminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThereminError::DeviceUnavailable(s) => {
                write!(f, "audio device unavailable (unsupported platform): {}", s)
            }
            ThereminError::PresetNotFound(s) => write!(f, "preset not found: '{}'", s),
            ThereminError::RecordingUnsupported(s) => write!(f, "recording unsupported: {}", s),
            ThereminError::InvalidParameter(s) => write!(f, "invalid parameter: {}", s),
            ThereminError::Storage(s) => write!(f, "storage failed: {}", s),
        }
    }
}

impl std::error::Error for ThereminError {}

/// Clamps `value` into `[min, max]`, logging a warning when it had to move.
///
/// NaN is treated as out of range and replaced by `min`.
pub(crate) fn clamp_param(name: &str, value: f64, min: f64, max: f64) -> f64 {
    let clamped = if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    };
    if clamped != value {
        log::warn!(
            "{}",
            ThereminError::InvalidParameter(format!(
                "{} = {} is out of range, clamped to {}",
                name, value, clamped
            ))
        );
    }
    clamped
}
