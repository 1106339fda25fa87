//! The settings snapshot shared by the graph manager and the performance controller.

use crate::error::clamp_param;
use serde::{Deserialize, Serialize};

/// Waveform produced by the tone source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneShape {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl ToneShape {
    /// All shapes in the order they are offered to the player.
    pub const ALL: [ToneShape; 4] = [
        ToneShape::Sine,
        ToneShape::Square,
        ToneShape::Sawtooth,
        ToneShape::Triangle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToneShape::Sine => "sine",
            ToneShape::Square => "square",
            ToneShape::Sawtooth => "sawtooth",
            ToneShape::Triangle => "triangle",
        }
    }
}

/// Lowest and highest tremolo rates accepted by the setters, in Hz.
pub const MIN_TREMOLO_RATE: f64 = 0.1;
pub const MAX_TREMOLO_RATE: f64 = 20.0;
/// Upper bound for the distortion drive amount.
pub const MAX_DISTORTION_DRIVE: f64 = 100.0;
/// Upper bound for the volume sensitivity multiplier.
pub const MAX_VOLUME_SENSITIVITY: f64 = 2.0;

/// Enabled effects and their numeric parameters.
///
/// Every parameter stays meaningful while its effect is disabled, so toggling
/// an effect only changes the graph topology. The serialized form is a flat
/// record; fields missing from stored data fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "waveform")]
    pub tone_shape: ToneShape,
    #[serde(rename = "reverbEnabled")]
    pub reverb_enabled: bool,
    /// Wet/dry blend (0.0 = all dry, 1.0 = all wet)
    #[serde(rename = "reverbAmount")]
    pub reverb_mix: f64,
    #[serde(rename = "tremoloEnabled")]
    pub tremolo_enabled: bool,
    #[serde(rename = "tremoloSpeed")]
    pub tremolo_rate_hz: f64,
    #[serde(rename = "tremoloDepth")]
    pub tremolo_depth: f64,
    #[serde(rename = "distortionEnabled")]
    pub distortion_enabled: bool,
    #[serde(rename = "distortionAmount")]
    pub distortion_drive: f64,
    #[serde(rename = "volumeSensitivity")]
    pub volume_sensitivity: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tone_shape: ToneShape::Sine,
            reverb_enabled: false,
            reverb_mix: 0.3,
            tremolo_enabled: false,
            tremolo_rate_hz: 5.0,
            tremolo_depth: 0.5,
            distortion_enabled: false,
            distortion_drive: 10.0,
            volume_sensitivity: 1.0,
        }
    }
}

impl Settings {
    /// Returns a copy with every numeric field clamped into its domain.
    ///
    /// Used on anything that arrives from outside (stored presets, setters).
    pub fn sanitized(&self) -> Self {
        Self {
            tone_shape: self.tone_shape,
            reverb_enabled: self.reverb_enabled,
            reverb_mix: clamp_param("reverb_mix", self.reverb_mix, 0.0, 1.0),
            tremolo_enabled: self.tremolo_enabled,
            tremolo_rate_hz: clamp_param(
                "tremolo_rate_hz",
                self.tremolo_rate_hz,
                MIN_TREMOLO_RATE,
                MAX_TREMOLO_RATE,
            ),
            tremolo_depth: clamp_param("tremolo_depth", self.tremolo_depth, 0.0, 1.0),
            distortion_enabled: self.distortion_enabled,
            distortion_drive: clamp_param(
                "distortion_drive",
                self.distortion_drive,
                0.0,
                MAX_DISTORTION_DRIVE,
            ),
            volume_sensitivity: clamp_param(
                "volume_sensitivity",
                self.volume_sensitivity,
                0.0,
                MAX_VOLUME_SENSITIVITY,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.tone_shape, ToneShape::Sine);
        assert!(!settings.reverb_enabled);
        assert_eq!(settings.reverb_mix, 0.3);
        assert_eq!(settings.tremolo_rate_hz, 5.0);
        assert_eq!(settings.distortion_drive, 10.0);
        assert_eq!(settings.volume_sensitivity, 1.0);
    }

    #[test]
    fn test_sanitized_clamps() {
        let settings = Settings {
            reverb_mix: 1.7,
            tremolo_rate_hz: -3.0,
            tremolo_depth: 2.0,
            distortion_drive: -1.0,
            volume_sensitivity: f64::NAN,
            ..Settings::default()
        }
        .sanitized();
        assert_eq!(settings.reverb_mix, 1.0);
        assert_eq!(settings.tremolo_rate_hz, MIN_TREMOLO_RATE);
        assert_eq!(settings.tremolo_depth, 1.0);
        assert_eq!(settings.distortion_drive, 0.0);
        assert_eq!(settings.volume_sensitivity, 0.0);
    }

    #[test]
    fn test_flat_json_layout() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object["waveform"], "sine");
        assert_eq!(object["reverbAmount"], 0.3);
        assert_eq!(object["tremoloSpeed"], 5.0);
        assert!(object.values().all(|v| !v.is_object() && !v.is_array()));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"waveform":"square","reverbEnabled":true}"#).unwrap();
        assert_eq!(settings.tone_shape, ToneShape::Square);
        assert!(settings.reverb_enabled);
        assert_eq!(settings.tremolo_depth, 0.5);
    }
}
