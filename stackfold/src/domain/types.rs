//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep validated numbers apart from raw ones: a
//! `SampleRate` is always in (0, 1], a `TimeWindow` never runs backwards.

// Exponent detection works on f64 logarithms
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]

use std::fmt;

use stackfold_common::DOWNSAMPLE_FACTOR;

use super::errors::FlameGraphError;

/// Largest exponent whose power of five still fits in a `u64`.
const MAX_EXACT_EXPONENT: u32 = 27;

/// Relative tolerance when recognising a rate as an exact `1 / 5^N`: a few
/// ULPs, enough for a rate that went through decimal text and back.
const EXPONENT_TOLERANCE: f64 = 4.0 * f64::EPSILON;

/// Fraction of raw samples kept by an events table.
///
/// Always in (0, 1]. A rate of 1 means the table was not downsampled.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SampleRate(f64);

impl SampleRate {
    /// Full resolution (no downsampling).
    pub const FULL: SampleRate = SampleRate(1.0);

    /// Validate a raw rate.
    ///
    /// # Errors
    /// Returns `InvalidInput` unless `rate` is finite and in (0, 1].
    pub fn new(rate: f64) -> Result<Self, FlameGraphError> {
        if rate.is_finite() && rate > 0.0 && rate <= 1.0 {
            Ok(Self(rate))
        } else {
            Err(FlameGraphError::invalid(format!("sample rate {rate} is outside (0, 1]")))
        }
    }

    /// Rate of the table downsampled `exponent` times (`1 / 5^exponent`).
    #[must_use]
    pub fn from_exponent(exponent: u32) -> Self {
        Self(1.0 / (DOWNSAMPLE_FACTOR as f64).powi(exponent as i32))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// The downsample exponent `N` if this rate is exactly `1 / 5^N`.
    #[must_use]
    pub fn exponent(self) -> Option<u32> {
        let estimate = (-self.0.ln() / (DOWNSAMPLE_FACTOR as f64).ln()).round();
        if !(0.0..=f64::from(MAX_EXACT_EXPONENT)).contains(&estimate) {
            return None;
        }
        let exponent = estimate as u32;
        let exact = Self::from_exponent(exponent).value();
        ((self.0 - exact).abs() <= EXPONENT_TOLERANCE * exact).then_some(exponent)
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Query time window in seconds (start inclusive, end exclusive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    start: f64,
    end: f64,
}

impl TimeWindow {
    /// # Errors
    /// Returns `InvalidInput` when either bound is not finite or `end < start`.
    pub fn new(start: f64, end: f64) -> Result<Self, FlameGraphError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(FlameGraphError::invalid("time window bounds must be finite"));
        }
        if end < start {
            return Err(FlameGraphError::invalid(format!(
                "time window ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Window covering `seconds` seconds from zero.
    ///
    /// # Errors
    /// Returns `InvalidInput` for negative or non-finite durations.
    pub fn from_seconds(seconds: f64) -> Result<Self, FlameGraphError> {
        Self::new(0.0, seconds)
    }

    /// Length of the window (`TotalSeconds` in the flame graph payload).
    #[must_use]
    pub fn seconds(self) -> f64 {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_rejects_out_of_range() {
        assert!(SampleRate::new(0.0).is_err());
        assert!(SampleRate::new(-0.5).is_err());
        assert!(SampleRate::new(1.5).is_err());
        assert!(SampleRate::new(f64::NAN).is_err());
        assert!(SampleRate::new(1.0).is_ok());
        assert!(SampleRate::new(0.2).is_ok());
    }

    #[test]
    fn test_sample_rate_exponent_roundtrips_powers_of_five() {
        for n in 0..=11 {
            assert_eq!(SampleRate::from_exponent(n).exponent(), Some(n), "exponent {n}");
        }
        assert_eq!(SampleRate::new(0.2).unwrap().exponent(), Some(1));
        assert_eq!(SampleRate::new(0.04).unwrap().exponent(), Some(2));
    }

    #[test]
    fn test_sample_rate_exponent_none_for_arbitrary_rate() {
        assert_eq!(SampleRate::new(0.3).unwrap().exponent(), None);
        assert_eq!(SampleRate::new(0.5).unwrap().exponent(), None);
    }

    #[test]
    fn test_sample_rate_exponent_none_for_near_power_of_five() {
        assert_eq!(SampleRate::new(0.200_000_000_1).unwrap().exponent(), None);
        assert_eq!(SampleRate::new(0.999_999_999).unwrap().exponent(), None);
        assert_eq!(SampleRate::new(0.001_600_000_001).unwrap().exponent(), None);
        // decimal text of 1/5^5
        assert_eq!(SampleRate::new(0.00032).unwrap().exponent(), Some(5));
    }

    #[test]
    fn test_time_window_seconds() {
        let window = TimeWindow::new(1_700_000_000.0, 1_700_000_900.0).unwrap();
        assert!((window.seconds() - 900.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_time_window_rejects_reversed_bounds() {
        assert!(TimeWindow::new(10.0, 5.0).is_err());
        assert!(TimeWindow::from_seconds(-1.0).is_err());
    }
}
