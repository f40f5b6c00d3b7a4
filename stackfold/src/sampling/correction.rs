//! Population estimate for downsampled reads.
//!
//! Only the two summary totals are scaled. Per-node counts in the flame graph
//! stay raw sample counts from the table that was read.

// The non-power-of-five fallback goes through f64
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use log::debug;
use stackfold_common::DOWNSAMPLE_FACTOR;

use crate::analysis::ElasticFlameGraph;
use crate::domain::{SampleRate, TimeWindow};

/// `floor(sampled_traces / rate)`.
///
/// Rates that are exactly `1 / 5^N` are applied as an integer multiplication
/// by `5^N`; dividing by the f64 rate would land just below the integer result
/// for some exponents and the floor would lose one trace.
#[must_use]
pub fn estimate_total_traces(sampled_traces: u64, rate: SampleRate) -> u64 {
    let estimate = if let Some(exponent) = rate.exponent() {
        sampled_traces.saturating_mul(DOWNSAMPLE_FACTOR.saturating_pow(exponent))
    } else {
        debug!("sample rate {rate} is not a power of 1/{DOWNSAMPLE_FACTOR}, using f64 division");
        (sampled_traces as f64 / rate.value()).floor() as u64
    };
    estimate.max(sampled_traces)
}

/// Attach `TotalSeconds` and `TotalTraces` to an assembled flame graph.
#[must_use]
pub fn apply_correction(
    mut graph: ElasticFlameGraph,
    rate: SampleRate,
    window: TimeWindow,
) -> ElasticFlameGraph {
    graph.total_seconds = window.seconds();
    graph.total_traces = estimate_total_traces(graph.sampled_traces, rate);
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsampled_by_five() {
        let rate = SampleRate::new(0.2).unwrap();
        assert_eq!(estimate_total_traces(1000, rate), 5000);
    }

    #[test]
    fn test_full_rate_is_identity() {
        assert_eq!(estimate_total_traces(1234, SampleRate::FULL), 1234);
    }

    #[test]
    fn test_exact_for_high_exponents() {
        // f64 division gives 3_124_999 here
        let rate = SampleRate::from_exponent(5);
        assert_eq!(estimate_total_traces(1000, rate), 3_125_000);
    }

    #[test]
    fn test_arbitrary_rate_floors() {
        let rate = SampleRate::new(0.3).unwrap();
        assert_eq!(estimate_total_traces(10, rate), 33);
    }

    #[test]
    fn test_near_power_of_five_uses_division() {
        let rate = SampleRate::new(0.200_000_000_1).unwrap();
        assert_eq!(estimate_total_traces(1_000_000_000, rate), 4_999_999_997);
    }

    #[test]
    fn test_never_below_sampled() {
        for exponent in 0..=11 {
            let rate = SampleRate::from_exponent(exponent);
            for sampled in [0, 1, 7, 999, 1_000_000] {
                assert!(estimate_total_traces(sampled, rate) >= sampled);
            }
        }
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        let rate = SampleRate::from_exponent(11);
        assert_eq!(estimate_total_traces(u64::MAX / 2, rate), u64::MAX);
    }

    #[test]
    fn test_apply_correction_sets_totals() {
        let graph = ElasticFlameGraph { sampled_traces: 40, ..Default::default() };
        let window = TimeWindow::from_seconds(60.0).unwrap();
        let corrected = apply_correction(graph, SampleRate::from_exponent(2), window);

        assert_eq!(corrected.sampled_traces, 40);
        assert_eq!(corrected.total_traces, 1000);
        assert!((corrected.total_seconds - 60.0).abs() < f64::EPSILON);
    }
}
