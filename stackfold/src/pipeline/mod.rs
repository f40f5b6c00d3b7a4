//! # Flame Graph Pipeline
//!
//! Runs the four stages for one request, strictly in order:
//!
//! ```text
//! FetchedEvents ─► aggregate ─► columnarize ─► assemble ─► correct ─► ElasticFlameGraph
//!                      │             │
//!                      └──── FrameDirectory (shared, read-only)
//! ```
//!
//! A pipeline holds no per-request state, so one instance can serve
//! concurrent requests as long as its observer can be shared. Any stage error
//! aborts the request; there is no partial output.

pub mod instrumentation;

pub use instrumentation::{LogObserver, NoopObserver, Stage, StageObserver};

use log::info;

use crate::analysis::{assemble, build_graph_partitioned, create_columnar, ElasticFlameGraph};
use crate::directory::FrameDirectory;
use crate::domain::{FlameGraphError, TimeWindow};
use crate::fetch::{FetchResult, FetchedEvents};
use crate::sampling::apply_correction;
use instrumentation::timed;

/// Flame graph pipeline with an injected stage observer.
#[derive(Debug, Clone)]
pub struct Pipeline<O = LogObserver> {
    observer: O,
    partitions: usize,
}

impl Default for Pipeline<LogObserver> {
    fn default() -> Self {
        Self::new(LogObserver)
    }
}

impl<O: StageObserver> Pipeline<O> {
    #[must_use]
    pub fn new(observer: O) -> Self {
        Self { observer, partitions: 1 }
    }

    /// Aggregate events on `partitions` worker threads (1 = single pass).
    #[must_use]
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions.max(1);
        self
    }

    /// Build the flame graph for one request.
    ///
    /// # Errors
    /// - `InvalidInput` for an out-of-range sample rate or malformed events
    /// - `UnresolvedFrame` / `UnresolvedExecutable` for dangling references
    pub fn run(
        &self,
        events: &FetchedEvents,
        directory: &FrameDirectory,
        window: TimeWindow,
    ) -> Result<ElasticFlameGraph, FlameGraphError> {
        let rate = events.events_index.sample_rate()?;
        let expected = events.checked_total_count();

        let graph = timed(&self.observer, Stage::Aggregate, || {
            build_graph_partitioned(
                directory,
                &events.stack_traces,
                &events.stack_trace_events,
                self.partitions,
            )
        })?;
        debug_assert_eq!(graph.total_count(), expected);

        let columnar =
            timed(&self.observer, Stage::Columnarize, || create_columnar(&graph, directory))?;
        let flame_graph = timed(&self.observer, Stage::Assemble, || assemble(columnar))?;
        let flame_graph = timed(&self.observer, Stage::Correct, || {
            Ok::<_, FlameGraphError>(apply_correction(flame_graph, rate, window))
        })?;

        info!(
            "flame graph: {} nodes, {} sampled traces, {} estimated (rate {rate}, index {})",
            flame_graph.size,
            flame_graph.sampled_traces,
            flame_graph.total_traces,
            events.events_index.name,
        );
        Ok(flame_graph)
    }

    /// Build the flame graph from a complete fetch document.
    ///
    /// # Errors
    /// See [`Pipeline::run`].
    pub fn run_fetch(
        &self,
        fetch: FetchResult,
        window: TimeWindow,
    ) -> Result<ElasticFlameGraph, FlameGraphError> {
        let (events, directory) = fetch.into_parts();
        self.run(&events, &directory, window)
    }
}
