//! Time-automated parameters.
//!
//! An `AudioParam` holds a value plus a timeline of scheduled changes keyed by
//! the render clock. Stages evaluate it once per sample while rendering, so a
//! change scheduled from the control path is applied smoothly instead of as a
//! step.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParamEvent {
    SetValue {
        time: f64,
        value: f64,
    },
    LinearRamp {
        time: f64,
        value: f64,
    },
    ExponentialRamp {
        time: f64,
        value: f64,
    },
    SetTarget {
        time: f64,
        target: f64,
        time_constant: f64,
    },
}

impl ParamEvent {
    fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { time, .. }
            | ParamEvent::LinearRamp { time, .. }
            | ParamEvent::ExponentialRamp { time, .. }
            | ParamEvent::SetTarget { time, .. } => time,
        }
    }
}

/// What the parameter is doing between events.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment {
    Hold,
    Target {
        start_time: f64,
        start_value: f64,
        target: f64,
        time_constant: f64,
    },
    Ramp {
        exponential: bool,
        start_time: f64,
        start_value: f64,
        end_time: f64,
        end_value: f64,
    },
}

/// A stage parameter with sample-accurate automation.
///
/// # Examples
///
/// ```
/// use theremin::AudioParam;
///
/// let mut gain = AudioParam::new(0.0, 0.0, 10.0);
/// gain.set_target_at_time(1.0, 0.0, 0.01);
///
/// // After five time constants the value is within 1% of the target
/// assert!((gain.advance(0.05) - 1.0).abs() < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct AudioParam {
    value: f64,
    min: f64,
    max: f64,
    events: VecDeque<ParamEvent>,
    segment: Segment,
    last_event_time: f64,
    last_time: f64,
}

impl AudioParam {
    /// Creates a parameter holding `value`, clamped on output to `[min, max]`.
    ///
    /// # Arguments
    ///
    /// * `value` - Starting value
    /// * `min` - Lowest value the parameter reports
    /// * `max` - Highest value the parameter reports
    ///
    /// # Examples
    ///
    /// ```
    /// use theremin::AudioParam;
    ///
    /// let mut gain = AudioParam::new(1.0, 0.0, 2.0);
    /// assert_eq!(gain.value(), 1.0);
    /// gain.set_value(5.0);
    /// assert_eq!(gain.value(), 2.0);
    /// ```
    pub fn new(value: f64, min: f64, max: f64) -> Self {
        Self {
            value,
            min,
            max,
            events: VecDeque::new(),
            segment: Segment::Hold,
            last_event_time: 0.0,
            last_time: 0.0,
        }
    }

    /// Current value, as of the last evaluated sample.
    pub fn value(&self) -> f64 {
        self.value.clamp(self.min, self.max)
    }

    /// Jumps to `value` immediately, discarding any scheduled automation.
    pub fn set_value(&mut self, value: f64) {
        self.events.clear();
        self.segment = Segment::Hold;
        self.value = value;
    }

    /// Jumps to `value` at `time`.
    pub fn set_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(ParamEvent::SetValue { time, value });
    }

    /// Ramps linearly from the previous event to `value`, arriving at `time`.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(ParamEvent::LinearRamp { time, value });
    }

    /// Ramps exponentially from the previous event to `value`, arriving at `time`.
    ///
    /// Both endpoints must share a sign and be non-zero; otherwise the value
    /// holds until `time` and then jumps.
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(ParamEvent::ExponentialRamp { time, value });
    }

    /// Starts an exponential approach towards `target` at `start_time`.
    ///
    /// After one `time_constant` the remaining distance is `1/e` of the
    /// original. A non-positive time constant jumps straight to the target.
    pub fn set_target_at_time(&mut self, target: f64, start_time: f64, time_constant: f64) {
        self.insert(ParamEvent::SetTarget {
            time: start_time,
            target,
            time_constant,
        });
    }

    /// Drops every event scheduled at or after `time`.
    ///
    /// A ramp that has not finished by `time` stops where it is.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|event| event.time() < time);
        match self.segment {
            Segment::Ramp { end_time, .. } if end_time >= time => self.segment = Segment::Hold,
            Segment::Target { start_time, .. } if start_time >= time => {
                self.segment = Segment::Hold
            }
            _ => {}
        }
    }

    /// True while events are pending or a ramp/approach is in progress.
    pub fn has_automation(&self) -> bool {
        !self.events.is_empty() || self.segment != Segment::Hold
    }

    fn insert(&mut self, event: ParamEvent) {
        let time = event.time();
        let index = self
            .events
            .iter()
            .position(|existing| existing.time() > time)
            .unwrap_or(self.events.len());
        self.events.insert(index, event);
    }

    /// Evaluates the parameter at `time`, consuming events that have become due.
    ///
    /// Times passed to successive calls must not decrease.
    pub fn advance(&mut self, time: f64) -> f64 {
        loop {
            if let Segment::Ramp {
                end_time,
                end_value,
                ..
            } = self.segment
                && time >= end_time
            {
                self.value = end_value;
                self.last_event_time = end_time;
                self.segment = Segment::Hold;
                continue;
            }

            let Some(event) = self.events.front().copied() else {
                break;
            };
            match event {
                ParamEvent::SetValue { time: at, value } if at <= time => {
                    self.events.pop_front();
                    self.value = value;
                    self.last_event_time = at;
                    self.segment = Segment::Hold;
                }
                ParamEvent::SetTarget {
                    time: at,
                    target,
                    time_constant,
                } if at <= time => {
                    self.events.pop_front();
                    self.last_event_time = at;
                    self.segment = Segment::Target {
                        start_time: at,
                        start_value: self.value,
                        target,
                        time_constant,
                    };
                }
                ParamEvent::LinearRamp { time: end, value }
                | ParamEvent::ExponentialRamp { time: end, value }
                    if !matches!(self.segment, Segment::Ramp { .. }) =>
                {
                    self.events.pop_front();
                    let start_time = match self.segment {
                        Segment::Target { .. } => self.last_time,
                        _ => self.last_event_time,
                    };
                    self.segment = Segment::Ramp {
                        exponential: matches!(event, ParamEvent::ExponentialRamp { .. }),
                        start_time,
                        start_value: self.value,
                        end_time: end,
                        end_value: value,
                    };
                }
                _ => break,
            }
        }

        self.value = match self.segment {
            Segment::Hold => self.value,
            Segment::Target {
                start_time,
                start_value,
                target,
                time_constant,
            } => {
                if time_constant <= 0.0 {
                    target
                } else {
                    target + (start_value - target) * (-(time - start_time) / time_constant).exp()
                }
            }
            Segment::Ramp {
                exponential,
                start_time,
                start_value,
                end_time,
                end_value,
            } => {
                let span = end_time - start_time;
                let fraction = if span > 0.0 {
                    ((time - start_time) / span).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                if !exponential {
                    start_value + (end_value - start_value) * fraction
                } else if start_value * end_value > 0.0 {
                    start_value * (end_value / start_value).powf(fraction)
                } else {
                    start_value
                }
            }
        };
        self.last_time = time;
        self.value()
    }

    /// Fills `out` with one value per sample, starting at `start_time`.
    pub fn fill(&mut self, start_time: f64, sample_rate: f64, out: &mut [f64]) {
        if !self.has_automation() {
            out.fill(self.value());
            return;
        }
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.advance(start_time + i as f64 / sample_rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold() {
        let mut param = AudioParam::new(0.25, 0.0, 1.0);
        assert_eq!(param.advance(1.0), 0.25);
        assert!(!param.has_automation());
    }

    #[test]
    fn test_output_is_clamped() {
        let mut param = AudioParam::new(0.0, 0.0, 1.0);
        param.set_value(4.0);
        assert_eq!(param.value(), 1.0);
    }

    #[test]
    fn test_set_value_at_time() {
        let mut param = AudioParam::new(0.0, 0.0, 1.0);
        param.set_value_at_time(0.8, 0.5);
        assert_eq!(param.advance(0.49), 0.0);
        assert_eq!(param.advance(0.5), 0.8);
    }

    #[test]
    fn test_set_target_approach() {
        let mut param = AudioParam::new(0.0, 0.0, 10.0);
        param.set_target_at_time(1.0, 0.0, 0.1);
        param.advance(0.0);
        let one_tau = param.advance(0.1);
        assert!((one_tau - (1.0 - (-1.0_f64).exp())).abs() < 1e-9);
        let later = param.advance(1.0);
        assert!((later - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_set_target_is_monotonic() {
        let mut param = AudioParam::new(65.0, 0.0, 20000.0);
        param.set_target_at_time(3000.0, 0.0, 0.01);
        let mut previous = param.advance(0.0);
        for i in 1..1000 {
            let v = param.advance(i as f64 / 44100.0);
            assert!(v >= previous);
            previous = v;
        }
    }

    #[test]
    fn test_linear_ramp() {
        let mut param = AudioParam::new(0.0, 0.0, 1.0);
        param.set_value_at_time(0.0, 0.0);
        param.linear_ramp_to_value_at_time(1.0, 1.0);
        param.advance(0.0);
        assert!((param.advance(0.5) - 0.5).abs() < 1e-9);
        assert_eq!(param.advance(2.0), 1.0);
        assert!(!param.has_automation());
    }

    #[test]
    fn test_exponential_ramp() {
        let mut param = AudioParam::new(1.0, 0.0, 1.0);
        param.set_value_at_time(1.0, 0.0);
        param.exponential_ramp_to_value_at_time(0.001, 0.1);
        param.advance(0.0);
        let halfway = param.advance(0.05);
        assert!((halfway - 0.001_f64.sqrt()).abs() < 1e-6);
        assert!((param.advance(0.1) - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_ramp_to_zero_holds() {
        let mut param = AudioParam::new(0.5, 0.0, 1.0);
        param.set_value_at_time(0.5, 0.0);
        param.exponential_ramp_to_value_at_time(0.0, 0.1);
        param.advance(0.0);
        assert_eq!(param.advance(0.05), 0.5);
        assert_eq!(param.advance(0.1), 0.0);
    }

    #[test]
    fn test_cancel_scheduled_values() {
        let mut param = AudioParam::new(1.0, 0.0, 1.0);
        param.set_value_at_time(1.0, 0.0);
        param.linear_ramp_to_value_at_time(0.0, 1.0);
        param.advance(0.0);
        let mid = param.advance(0.5);
        param.cancel_scheduled_values(0.5);
        assert_eq!(param.advance(0.9), mid);
        assert!(!param.has_automation());
    }

    #[test]
    fn test_events_are_time_ordered() {
        let mut param = AudioParam::new(0.0, 0.0, 1.0);
        param.set_value_at_time(0.9, 0.2);
        param.set_value_at_time(0.1, 0.1);
        assert_eq!(param.advance(0.15), 0.1);
        assert_eq!(param.advance(0.25), 0.9);
    }

    #[test]
    fn test_fill() {
        let mut param = AudioParam::new(0.0, 0.0, 1.0);
        param.set_value_at_time(1.0, 2.0 / 100.0);
        let mut out = [0.0; 4];
        param.fill(0.0, 100.0, &mut out);
        assert_eq!(out, [0.0, 0.0, 1.0, 1.0]);
    }
}
