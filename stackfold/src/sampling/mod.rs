//! Downsampled events tables and the compensation for reading from them.
//!
//! The backing store keeps the full-resolution events table plus coarser
//! copies, each keeping one in five samples of the previous one. Reading from
//! table `N` is cheaper but every count in it must be scaled by `5^N` to
//! estimate the population.
//!
//! - [`events_index`]: which table events came from, and how the fetch side
//!   picks one for a target sample size
//! - [`correction`]: `TotalTraces` estimate attached to the flame graph

pub mod correction;
pub mod events_index;

pub use correction::{apply_correction, estimate_total_traces};
pub use events_index::EventsIndex;
