//! Outbound notifications to whatever presents the instrument.

use crate::settings::Settings;

/// Receives everything the engine wants shown to the player.
///
/// All methods default to doing nothing, so an implementation only overrides
/// what it can display.
pub trait ControlBinding: Send {
    /// Pitch currently targeted, in Hz.
    fn show_frequency(&mut self, _hz: f64) {}

    /// Amplitude currently targeted.
    fn show_volume(&mut self, _volume: f64) {}

    /// Normalised pointer position, or `None` to hide the indicator.
    fn show_position(&mut self, _position: Option<(f64, f64)>) {}

    /// Called whenever the live settings are replaced or changed.
    fn sync_settings(&mut self, _settings: &Settings) {}

    /// A recovered error the player may want to know about.
    fn show_warning(&mut self, _message: &str) {}
}

/// A binding that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBinding;

impl ControlBinding for NullBinding {}
