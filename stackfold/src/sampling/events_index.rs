//! Events table identification and selection.

use serde::{Deserialize, Serialize};
use stackfold_common::{DOWNSAMPLE_FACTOR, MAX_DOWNSAMPLE_EXPONENT};

use crate::domain::{FlameGraphError, SampleRate};

/// Full-resolution events table.
pub const FULL_EVENTS_INDEX: &str = "profiling-events-all";

/// Prefix of the downsampled tables (`profiling-events-5pow01` ..
/// `profiling-events-5pow11`).
pub const DOWNSAMPLED_INDEX_PREFIX: &str = "profiling-events-5pow";

/// The events table a batch of stack trace events was read from.
///
/// `sample_rate` must be the rate of *this* table. Scaling counts with another
/// table's rate biases every estimate by a power of five.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsIndex {
    #[serde(default)]
    pub name: String,
    pub sample_rate: f64,
}

impl Default for EventsIndex {
    fn default() -> Self {
        Self::full()
    }
}

impl EventsIndex {
    #[must_use]
    pub fn full() -> Self {
        Self { name: FULL_EVENTS_INDEX.to_string(), sample_rate: 1.0 }
    }

    /// Table downsampled `exponent` times; exponent 0 is the full table.
    ///
    /// Exponents beyond the coarsest table are clamped to it.
    #[must_use]
    pub fn downsampled(exponent: u32) -> Self {
        let exponent = exponent.min(MAX_DOWNSAMPLE_EXPONENT);
        if exponent == 0 {
            return Self::full();
        }
        Self {
            name: format!("{DOWNSAMPLED_INDEX_PREFIX}{exponent:02}"),
            sample_rate: SampleRate::from_exponent(exponent).value(),
        }
    }

    /// Validated sample rate of this table.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the rate is outside (0, 1].
    pub fn sample_rate(&self) -> Result<SampleRate, FlameGraphError> {
        SampleRate::new(self.sample_rate)
    }

    /// Pick the events table to read from.
    ///
    /// `sample_count` is the number of events a probe query found in the table
    /// with exponent `initial_exponent`. Coarser tables are chosen while the
    /// estimate still exceeds `target_sample_size`; finer ones are chosen
    /// until the estimate reaches it.
    #[must_use]
    pub fn select(sample_count: u64, initial_exponent: u32, target_sample_size: u64) -> Self {
        if sample_count == 0 {
            return Self::full();
        }
        let initial_exponent = initial_exponent.min(MAX_DOWNSAMPLE_EXPONENT);

        if sample_count >= target_sample_size {
            let mut estimate = sample_count;
            for exponent in initial_exponent..=MAX_DOWNSAMPLE_EXPONENT {
                if estimate < target_sample_size {
                    return Self::downsampled(exponent);
                }
                estimate /= DOWNSAMPLE_FACTOR;
            }
            return Self::downsampled(MAX_DOWNSAMPLE_EXPONENT);
        }

        let mut estimate = sample_count;
        for exponent in (0..initial_exponent).rev() {
            estimate = estimate.saturating_mul(DOWNSAMPLE_FACTOR);
            if estimate >= target_sample_size {
                return Self::downsampled(exponent);
            }
        }
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackfold_common::DEFAULT_TARGET_SAMPLE_SIZE;

    #[test]
    fn test_downsampled_index_naming() {
        assert_eq!(EventsIndex::downsampled(0).name, "profiling-events-all");
        assert_eq!(EventsIndex::downsampled(1).name, "profiling-events-5pow01");
        assert_eq!(EventsIndex::downsampled(11).name, "profiling-events-5pow11");
        assert_eq!(EventsIndex::downsampled(40).name, "profiling-events-5pow11");
    }

    #[test]
    fn test_downsampled_index_rate() {
        let index = EventsIndex::downsampled(3);
        assert!((index.sample_rate - 1.0 / 125.0).abs() < 1e-15);
        assert_eq!(index.sample_rate().unwrap().exponent(), Some(3));
    }

    #[test]
    fn test_select_empty_probe_uses_full_table() {
        assert_eq!(EventsIndex::select(0, 6, DEFAULT_TARGET_SAMPLE_SIZE), EventsIndex::full());
    }

    #[test]
    fn test_select_steps_to_coarser_table() {
        // 1_000_000 -> 200_000 -> 40_000 -> 8_000
        let index = EventsIndex::select(1_000_000, 0, DEFAULT_TARGET_SAMPLE_SIZE);
        assert_eq!(index, EventsIndex::downsampled(3));
    }

    #[test]
    fn test_select_steps_to_finer_table() {
        // 100 @6 -> 500 @5 -> 2_500 @4 -> 12_500 @3 -> 62_500 @2
        let index = EventsIndex::select(100, 6, DEFAULT_TARGET_SAMPLE_SIZE);
        assert_eq!(index, EventsIndex::downsampled(2));
    }

    #[test]
    fn test_select_falls_back_to_full_table() {
        let index = EventsIndex::select(10, 1, DEFAULT_TARGET_SAMPLE_SIZE);
        assert_eq!(index, EventsIndex::full());
    }

    #[test]
    fn test_select_clamps_to_coarsest_table() {
        let index = EventsIndex::select(u64::MAX, 0, 10);
        assert_eq!(index, EventsIndex::downsampled(MAX_DOWNSAMPLE_EXPONENT));
    }

    #[test]
    fn test_invalid_rate_is_rejected() {
        let index = EventsIndex { name: "broken".to_string(), sample_rate: 0.0 };
        assert!(matches!(index.sample_rate(), Err(FlameGraphError::InvalidInput(_))));
    }
}
