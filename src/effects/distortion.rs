//! Distortion curve generation and waveshaping.

use std::f64::consts::PI;

/// Number of points in a generated distortion curve.
pub const CURVE_RESOLUTION: usize = 44100;

/// Fixed small-angle scaling applied to every curve point (20 degrees in radians).
const CURVE_ANGLE: f64 = 20.0 * PI / 180.0;

/// Builds the waveshaper transfer function for a drive amount.
///
/// Sample `i` maps `x = 2i/resolution - 1` through
/// `(3 + drive) * x * k / (PI + drive * |x|)`. With `drive = 0` the curve is a
/// gentle straight line rather than an identity; higher drive bends it into
/// saturation. Negative drive is treated as zero.
///
/// # Examples
///
/// ```
/// use theremin::distortion_curve;
///
/// let curve = distortion_curve(10.0, 1024);
/// assert_eq!(curve.len(), 1024);
/// assert!(curve.iter().all(|v| (-1.0..=1.0).contains(v)));
/// ```
pub fn distortion_curve(drive: f64, resolution: usize) -> Vec<f64> {
    let drive = drive.max(0.0);
    (0..resolution)
        .map(|i| {
            let x = i as f64 * 2.0 / resolution as f64 - 1.0;
            (3.0 + drive) * x * CURVE_ANGLE / (PI + drive * x.abs())
        })
        .collect()
}

/// Nonlinear transfer stage driven by a lookup table.
///
/// Input in `[-1, 1]` indexes the curve with linear interpolation; input
/// outside that range sticks to the first or last point.
#[derive(Debug, Clone)]
pub struct WaveShaper {
    curve: Vec<f64>,
}

impl WaveShaper {
    /// Creates a shaper from a transfer curve, usually one made by
    /// [`distortion_curve`].
    ///
    /// # Examples
    ///
    /// ```
    /// use theremin::WaveShaper;
    ///
    /// let shaper = WaveShaper::new(vec![-1.0, 1.0]);
    /// assert_eq!(shaper.shape(0.5), 0.5);
    /// ```
    pub fn new(curve: Vec<f64>) -> Self {
        Self { curve }
    }

    /// Replaces the transfer curve. An empty curve passes the signal through.
    pub fn set_curve(&mut self, curve: Vec<f64>) {
        self.curve = curve;
    }

    pub fn curve(&self) -> &[f64] {
        &self.curve
    }

    /// Shapes a single sample.
    pub fn shape(&self, input: f64) -> f64 {
        let len = self.curve.len();
        match len {
            0 => input,
            1 => self.curve[0],
            _ => {
                let position = (len - 1) as f64 * 0.5 * (input + 1.0);
                if position.is_nan() || position <= 0.0 {
                    self.curve[0]
                } else if position >= (len - 1) as f64 {
                    self.curve[len - 1]
                } else {
                    let index = position.floor() as usize;
                    let fraction = position - index as f64;
                    self.curve[index] * (1.0 - fraction) + self.curve[index + 1] * fraction
                }
            }
        }
    }

    pub fn process(&self, input: &[f64], output: &mut [f64]) {
        for (out, &sample) in output.iter_mut().zip(input) {
            *out = self.shape(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_zero_drive_is_strictly_increasing() {
        let curve = distortion_curve(0.0, CURVE_RESOLUTION);
        assert!(curve.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_curve_zero_drive_is_not_identity() {
        let curve = distortion_curve(0.0, 4);
        // x = -1 maps to -3k/PI, far from -1
        assert!((curve[0] + 3.0 * CURVE_ANGLE / PI).abs() < 1e-12);
        assert!(curve[0] > -0.5);
    }

    #[test]
    fn test_curve_range() {
        for drive in [0.0, 1.0, 10.0, 50.0, 100.0] {
            let curve = distortion_curve(drive, 2048);
            assert!(curve.iter().all(|v| (-1.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_more_drive_saturates_faster() {
        let gentle = distortion_curve(1.0, 1000);
        let heavy = distortion_curve(50.0, 1000);
        // Near the middle of the positive half, heavier drive sits closer to its ceiling
        let i = 625;
        assert!(heavy[i] / heavy[999] > gentle[i] / gentle[999]);
    }

    #[test]
    fn test_negative_drive_treated_as_zero() {
        assert_eq!(distortion_curve(-5.0, 16), distortion_curve(0.0, 16));
    }

    #[test]
    fn test_shaper_interpolates() {
        let shaper = WaveShaper::new(vec![-1.0, 0.0, 1.0]);
        assert_eq!(shaper.shape(0.0), 0.0);
        assert!((shaper.shape(0.5) - 0.5).abs() < 1e-12);
        assert_eq!(shaper.shape(-3.0), -1.0);
        assert_eq!(shaper.shape(3.0), 1.0);
    }

    #[test]
    fn test_shaper_empty_curve_passes_through() {
        let shaper = WaveShaper::new(Vec::new());
        let mut out = [0.0; 3];
        shaper.process(&[0.1, -0.2, 0.3], &mut out);
        assert_eq!(out, [0.1, -0.2, 0.3]);
    }
}
