//! Alpha synthesis from classifier scores.
//!
//! The output is a three-region ramp: opaque, a linear anti-aliased
//! transition of width `smoothing`, and transparent. Its direction depends on
//! the mode: manual scores are distances (low = background), automatic scores
//! are likeness (high = background).

use std::ops::RangeInclusive;

use crate::error::{Error, Result};
use crate::key::Mode;

/// Accepted threshold values.
pub const THRESHOLD_RANGE: RangeInclusive<u8> = 1..=100;
/// Accepted smoothing values.
pub const SMOOTHING_RANGE: RangeInclusive<u8> = 0..=50;
/// Threshold used when no value is given.
pub const DEFAULT_THRESHOLD: u8 = 15;
/// Smoothing used when no value is given.
pub const DEFAULT_SMOOTHING: u8 = 25;
/// Threshold applied after picking a key color, where distances run larger.
pub const PICKED_COLOR_THRESHOLD: u8 = 30;

/// Validated threshold/smoothing pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyParams {
    threshold: u8,
    smoothing: u8,
}

impl Default for KeyParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            smoothing: DEFAULT_SMOOTHING,
        }
    }
}

impl KeyParams {
    /// Create a parameter pair, rejecting out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `threshold` is outside `1..=100`
    /// or `smoothing` is outside `0..=50`.
    pub fn new(threshold: u8, smoothing: u8) -> Result<Self> {
        if !THRESHOLD_RANGE.contains(&threshold) {
            return Err(range_error("threshold", threshold, &THRESHOLD_RANGE));
        }
        if !SMOOTHING_RANGE.contains(&smoothing) {
            return Err(range_error("smoothing", smoothing, &SMOOTHING_RANGE));
        }
        Ok(Self {
            threshold,
            smoothing,
        })
    }

    /// Create a parameter pair, clamping both values into range.
    #[must_use]
    pub fn clamped(threshold: i64, smoothing: i64) -> Self {
        let clamp = |v: i64, range: &RangeInclusive<u8>| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                v.clamp(i64::from(*range.start()), i64::from(*range.end())) as u8
            }
        };
        Self {
            threshold: clamp(threshold, &THRESHOLD_RANGE),
            smoothing: clamp(smoothing, &SMOOTHING_RANGE),
        }
    }

    /// Decision boundary on the classifier score.
    #[must_use]
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Width of the anti-aliased ramp.
    #[must_use]
    pub fn smoothing(&self) -> u8 {
        self.smoothing
    }
}

fn range_error(name: &'static str, value: u8, range: &RangeInclusive<u8>) -> Error {
    Error::invalid(name, value, i64::from(*range.start()), i64::from(*range.end()))
}

/// Map a classifier score to an alpha value.
///
/// A smoothing of zero collapses the ramp into a hard step at the threshold.
#[must_use]
pub fn alpha(score: f64, mode: &Mode, params: KeyParams) -> u8 {
    let threshold = f64::from(params.threshold);
    let smoothing = f64::from(params.smoothing);

    let value = match mode {
        Mode::Manual(_) => rising_edge(score, threshold, smoothing),
        Mode::AutoGreen => falling_edge(score, threshold, smoothing),
        Mode::AutoMagenta => falling_edge(score, 255.0 - threshold, smoothing),
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        value.clamp(0.0, 255.0) as u8
    }
}

/// Background below `boundary`, opaque from `boundary + smoothing` upward.
fn rising_edge(score: f64, boundary: f64, smoothing: f64) -> f64 {
    if score < boundary {
        0.0
    } else if score < boundary + smoothing {
        (255.0 * (score - boundary) / smoothing).floor()
    } else {
        255.0
    }
}

/// Background above `boundary`, opaque from `boundary - smoothing` downward.
fn falling_edge(score: f64, boundary: f64, smoothing: f64) -> f64 {
    if score > boundary {
        0.0
    } else if score > boundary - smoothing {
        (255.0 * (boundary - score) / smoothing).floor()
    } else {
        255.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{magenta_score, manual_score, KeyColor};
    use image::Rgba;

    fn params(t: u8, s: u8) -> KeyParams {
        KeyParams::new(t, s).unwrap()
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        assert!(matches!(
            KeyParams::new(0, 10),
            Err(Error::InvalidParameter { name: "threshold", .. })
        ));
        assert!(matches!(
            KeyParams::new(101, 10),
            Err(Error::InvalidParameter { name: "threshold", .. })
        ));
        assert!(matches!(
            KeyParams::new(10, 51),
            Err(Error::InvalidParameter { name: "smoothing", .. })
        ));
        assert!(KeyParams::new(1, 0).is_ok());
        assert!(KeyParams::new(100, 50).is_ok());
    }

    #[test]
    fn clamped_pulls_values_into_range() {
        let p = KeyParams::clamped(-5, 999);
        assert_eq!((p.threshold(), p.smoothing()), (1, 50));
        let p = KeyParams::clamped(40, 10);
        assert_eq!((p.threshold(), p.smoothing()), (40, 10));
    }

    #[test]
    fn default_matches_interactive_defaults() {
        let p = KeyParams::default();
        assert_eq!((p.threshold(), p.smoothing()), (15, 25));
    }

    #[test]
    fn manual_ramp_rises_with_distance() {
        let mode = Mode::Manual(KeyColor::new(10, 200, 10));
        let p = params(15, 25);
        assert_eq!(alpha(0.0, &mode, p), 0);
        assert_eq!(alpha(14.9, &mode, p), 0);
        assert_eq!(alpha(15.0, &mode, p), 0);
        // floor(255 * 12.5 / 25) = 127
        assert_eq!(alpha(27.5, &mode, p), 127);
        assert_eq!(alpha(40.0, &mode, p), 255);
        assert_eq!(alpha(150.0, &mode, p), 255);
    }

    #[test]
    fn green_ramp_falls_with_likeness() {
        let p = params(15, 25);
        assert_eq!(alpha(255.0, &Mode::AutoGreen, p), 0);
        assert_eq!(alpha(15.1, &Mode::AutoGreen, p), 0);
        assert_eq!(alpha(15.0, &Mode::AutoGreen, p), 0);
        // floor(255 * 15 / 25) = 153
        assert_eq!(alpha(0.0, &Mode::AutoGreen, p), 153);
        assert_eq!(alpha(-10.0, &Mode::AutoGreen, p), 255);
        assert_eq!(alpha(-150.0, &Mode::AutoGreen, p), 255);
    }

    #[test]
    fn magenta_ramp_uses_inverted_boundary() {
        let p = params(15, 25);
        // boundary is 240
        assert_eq!(alpha(255.0, &Mode::AutoMagenta, p), 0);
        assert_eq!(alpha(240.5, &Mode::AutoMagenta, p), 0);
        // floor(255 * 10 / 25) = 102
        assert_eq!(alpha(230.0, &Mode::AutoMagenta, p), 102);
        assert_eq!(alpha(215.0, &Mode::AutoMagenta, p), 255);
        assert_eq!(alpha(40.0, &Mode::AutoMagenta, p), 255);
    }

    #[test]
    fn zero_smoothing_is_a_hard_step() {
        let p = params(20, 0);
        let manual = Mode::Manual(KeyColor::new(0, 0, 0));
        assert_eq!(alpha(19.99, &manual, p), 0);
        assert_eq!(alpha(20.0, &manual, p), 255);
        assert_eq!(alpha(20.01, &Mode::AutoGreen, p), 0);
        assert_eq!(alpha(20.0, &Mode::AutoGreen, p), 255);
        assert_eq!(alpha(235.01, &Mode::AutoMagenta, p), 0);
        assert_eq!(alpha(235.0, &Mode::AutoMagenta, p), 255);
    }

    #[test]
    fn alpha_is_monotonic_across_the_ramp() {
        let p = params(30, 50);
        let mut prev = 0u8;
        for step in 0..=400 {
            let score = f64::from(step) * 0.25;
            let a = alpha(score, &Mode::Manual(KeyColor::new(0, 0, 0)), p);
            assert!(a >= prev, "alpha decreased at score {score}");
            prev = a;
        }

        let mut prev = 0u8;
        for step in (-255..=255).rev() {
            let a = alpha(f64::from(step), &Mode::AutoGreen, p);
            assert!(a >= prev, "alpha decreased at score {step}");
            prev = a;
        }
    }

    #[test]
    fn ramp_values_near_floor_boundaries() {
        // these land within a few ulps of an integer step in single precision
        let p = params(15, 25);
        let px = Rgba([189, 0, 255, 255]);
        assert_eq!(alpha(magenta_score(&px), &Mode::AutoMagenta, p), 242);
        let px = Rgba([190, 0, 255, 255]);
        assert_eq!(alpha(magenta_score(&px), &Mode::AutoMagenta, p), 237);

        let key = KeyColor::new(10, 200, 10);
        let px = Rgba([2, 48, 12, 255]);
        assert_eq!(alpha(manual_score(&px, key), &Mode::Manual(key), params(50, 3)), 62);
    }
}
