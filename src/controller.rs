//! Pointer performance: position to pitch and loudness.

use crate::binding::ControlBinding;
use crate::graph::{ParamId, SignalGraph};
use crate::scheduler::{Scheduler, Task, TaskId};

/// Pitch at the bottom of the playing surface, in Hz.
pub const MIN_FREQUENCY: f64 = 65.0;
/// Pitch at the top of the playing surface, in Hz.
pub const MAX_FREQUENCY: f64 = 3000.0;
/// Smoothing applied to pitch changes, in seconds.
pub const PITCH_TIME_CONSTANT: f64 = 0.01;
/// Smoothing applied to volume changes, in seconds.
pub const VOLUME_TIME_CONSTANT: f64 = 0.02;
/// Length of the fade-out after the pointer is released, in seconds.
pub const RELEASE_SECONDS: f64 = 0.1;
/// Gain the release fade ends on before it is forced to zero.
pub const RELEASE_FLOOR: f64 = 0.001;

/// Maps a normalised height to a pitch.
///
/// # Examples
///
/// ```
/// use theremin::frequency_for;
///
/// assert_eq!(frequency_for(0.0), 65.0);
/// assert_eq!(frequency_for(0.5), 1517.5);
/// assert_eq!(frequency_for(1.0), 3000.0);
/// ```
pub fn frequency_for(ny: f64) -> f64 {
    let ny = if ny.is_nan() { 0.0 } else { ny.clamp(0.0, 1.0) };
    MIN_FREQUENCY + ny * (MAX_FREQUENCY - MIN_FREQUENCY)
}

/// Maps a normalised horizontal position to an amplitude.
pub fn amplitude_for(nx: f64, sensitivity: f64) -> f64 {
    let nx = if nx.is_nan() { 0.0 } else { nx.clamp(0.0, 1.0) };
    nx * sensitivity.max(0.0)
}

/// The rectangle the player performs on, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamps a point to the surface and normalises it.
    ///
    /// `x` grows to the right and `y` grows upwards, so screen coordinates
    /// (origin top-left) are inverted vertically. A surface with no area maps
    /// everything to the bottom-left corner.
    pub fn normalize(&self, x: f64, y: f64) -> (f64, f64) {
        let axis = |value: f64, extent: f64| {
            if extent > 0.0 && value.is_finite() {
                (value / extent).clamp(0.0, 1.0)
            } else {
                0.0
            }
        };
        let nx = axis(x, self.width);
        let ny = if self.height > 0.0 && y.is_finite() {
            1.0 - axis(y, self.height)
        } else {
            0.0
        };
        (nx, ny)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Idle,
    /// The pointer is engaged and drives pitch and volume
    Sounding,
    /// Fading out; the task finalises the release when the fade is over
    Releasing(TaskId),
}

/// Owns the idle/sounding state machine.
///
/// Every change it makes goes through smoothed parameter automation on the
/// graph, never through connections.
#[derive(Debug)]
pub struct PerformanceController {
    state: PlayState,
    position: Option<(f64, f64)>,
}

impl PerformanceController {
    pub fn new() -> Self {
        Self {
            state: PlayState::Idle,
            position: None,
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    /// True while sound is being produced, including the release fade.
    pub fn is_sounding(&self) -> bool {
        self.state != PlayState::Idle
    }

    /// Last position applied, while engaged.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.position
    }

    /// Starts sounding at `(nx, ny)`. A release still in flight is abandoned.
    pub fn pointer_down(
        &mut self,
        graph: &mut SignalGraph,
        scheduler: &mut Scheduler,
        binding: &mut dyn ControlBinding,
        now: f64,
        (nx, ny): (f64, f64),
        sensitivity: f64,
    ) {
        if let PlayState::Releasing(task) = self.state {
            scheduler.cancel(task);
            log::debug!("release abandoned at {:.3}s", now);
        }
        self.state = PlayState::Sounding;
        self.apply(graph, binding, now, (nx, ny), sensitivity);
    }

    /// Follows the pointer. Ignored unless sounding.
    pub fn pointer_move(
        &mut self,
        graph: &mut SignalGraph,
        binding: &mut dyn ControlBinding,
        now: f64,
        (nx, ny): (f64, f64),
        sensitivity: f64,
    ) -> bool {
        if self.state != PlayState::Sounding {
            return false;
        }
        self.apply(graph, binding, now, (nx, ny), sensitivity);
        true
    }

    fn apply(
        &mut self,
        graph: &mut SignalGraph,
        binding: &mut dyn ControlBinding,
        now: f64,
        (nx, ny): (f64, f64),
        sensitivity: f64,
    ) {
        let frequency = frequency_for(ny);
        let amplitude = amplitude_for(nx, sensitivity);

        if let Some(pitch) = graph.param_mut(ParamId::Frequency) {
            pitch.set_target_at_time(frequency, now, PITCH_TIME_CONSTANT);
        }
        if let Some(volume) = graph.param_mut(ParamId::Volume) {
            volume.cancel_scheduled_values(now);
            volume.set_target_at_time(amplitude, now, VOLUME_TIME_CONSTANT);
        }

        self.position = Some((nx, ny));
        binding.show_frequency(frequency);
        binding.show_volume(amplitude);
        binding.show_position(self.position);
    }

    /// Begins the release fade. Returns false, doing nothing, unless sounding.
    pub fn stop(
        &mut self,
        graph: &mut SignalGraph,
        scheduler: &mut Scheduler,
        binding: &mut dyn ControlBinding,
        now: f64,
    ) -> bool {
        if self.state != PlayState::Sounding {
            return false;
        }
        if let Some(volume) = graph.param_mut(ParamId::Volume) {
            let current = volume.value();
            volume.cancel_scheduled_values(now);
            volume.set_value_at_time(current, now);
            volume.exponential_ramp_to_value_at_time(RELEASE_FLOOR, now + RELEASE_SECONDS);
        }
        let task = scheduler.schedule(now + RELEASE_SECONDS, Task::FinalizeRelease);
        self.state = PlayState::Releasing(task);
        self.position = None;
        binding.show_position(None);
        binding.show_volume(0.0);
        true
    }

    /// Drops straight to idle without a fade, for teardown.
    ///
    /// Any release task in flight is left for the caller to discard.
    pub fn halt(&mut self, binding: &mut dyn ControlBinding) {
        self.state = PlayState::Idle;
        self.position = None;
        binding.show_position(None);
        binding.show_volume(0.0);
    }

    /// Forces silence once the fade task `task` has come due.
    ///
    /// A task from an abandoned release is ignored.
    pub fn finalize_release(&mut self, graph: &mut SignalGraph, task: TaskId) -> bool {
        if self.state != PlayState::Releasing(task) {
            return false;
        }
        if let Some(volume) = graph.param_mut(ParamId::Volume) {
            volume.set_value(0.0);
        }
        self.state = PlayState::Idle;
        true
    }
}

impl Default for PerformanceController {
    fn default() -> Self {
        Self::new()
    }
}
