//! Caller-callee graph construction.
//!
//! Stack trace events are folded into a tree where every node is one call
//! path prefix. The same function reached through two different callers ends
//! up in two nodes; two traces that agree on their first `k` callers share
//! the first `k` nodes.
//!
//! # Architecture
//!
//! - **`GraphBuilder`** - mutable arena, one per aggregation pass (or one per
//!   partition when aggregating in parallel)
//! - **`CallerCalleeGraph`** - the frozen result, children sorted
//!
//! ```text
//! events ──► GraphBuilder::add_event() ──► GraphBuilder::finish() ──► CallerCalleeGraph
//!                                  ▲
//!        partial builders ─ merge ─┘   (partitioned build)
//! ```
//!
//! Nodes live in a `Vec` and refer to each other by index. Child lookup goes
//! through a `(parent index, FrameId)` map, so identity is by value and no
//! node ever holds a reference to another.

use std::collections::HashMap;

use crossbeam_channel::bounded;
use log::debug;
use stackfold_common::{FrameId, StackTrace, StackTraceEvent, StackTraceId};

use crate::directory::FrameDirectory;
use crate::domain::FlameGraphError;

/// Arena index of a node.
pub type NodeIndex = usize;

/// Index of the synthetic root node.
pub const ROOT: NodeIndex = 0;

/// One call path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerCalleeNode {
    /// Frame at the end of the path; `None` only for the root.
    pub frame_id: Option<FrameId>,
    pub parent: Option<NodeIndex>,
    /// Samples taken while this frame was the leaf.
    pub self_count: u64,
    /// Samples whose call path passes through this node.
    pub total_count: u64,
    pub children: Vec<NodeIndex>,
}

impl CallerCalleeNode {
    fn root() -> Self {
        Self { frame_id: None, parent: None, self_count: 0, total_count: 0, children: Vec::new() }
    }

    fn child(frame_id: FrameId, parent: NodeIndex) -> Self {
        Self {
            frame_id: Some(frame_id),
            parent: Some(parent),
            self_count: 0,
            total_count: 0,
            children: Vec::new(),
        }
    }
}

/// Frozen caller-callee graph.
///
/// Children of every node are ordered by descending `total_count`, ties by
/// ascending `FrameId`, so traversal order depends only on the aggregated
/// counts and never on event order.
#[derive(Debug, Clone)]
pub struct CallerCalleeGraph {
    nodes: Vec<CallerCalleeNode>,
}

impl CallerCalleeGraph {
    #[must_use]
    pub fn root(&self) -> &CallerCalleeNode {
        &self.nodes[ROOT]
    }

    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&CallerCalleeNode> {
        self.nodes.get(index)
    }

    /// Sum of all event counts.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.root().total_count
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no events were aggregated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Node reached by following `path` (caller first) from the root.
    #[must_use]
    pub fn find_path(&self, path: &[FrameId]) -> Option<&CallerCalleeNode> {
        let mut current = ROOT;
        for frame_id in path {
            current = *self.nodes[current]
                .children
                .iter()
                .find(|&&c| self.nodes[c].frame_id.as_ref() == Some(frame_id))?;
        }
        self.nodes.get(current)
    }

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &CallerCalleeNode> {
        self.nodes.iter()
    }
}

/// Accumulates stack trace events into an arena.
///
/// Borrowed lookup tables are shared with other builders; only the arena and
/// its edge map are owned.
#[derive(Debug)]
pub struct GraphBuilder<'a> {
    directory: &'a FrameDirectory,
    stack_traces: &'a HashMap<StackTraceId, StackTrace>,
    nodes: Vec<CallerCalleeNode>,
    edges: HashMap<(NodeIndex, FrameId), NodeIndex>,
}

impl<'a> GraphBuilder<'a> {
    #[must_use]
    pub fn new(
        directory: &'a FrameDirectory,
        stack_traces: &'a HashMap<StackTraceId, StackTrace>,
    ) -> Self {
        Self { directory, stack_traces, nodes: vec![CallerCalleeNode::root()], edges: HashMap::new() }
    }

    /// Add one event.
    ///
    /// The trace is checked completely before any count is touched, so a
    /// failing event leaves the arena unchanged.
    ///
    /// # Errors
    /// - `InvalidInput` for a zero count, an unknown trace id, an empty trace
    ///   or a running total that no longer fits in `u64`
    /// - `UnresolvedFrame` / `UnresolvedExecutable` for frames missing from
    ///   the directory
    pub fn add_event(&mut self, event: &StackTraceEvent) -> Result<(), FlameGraphError> {
        if event.count == 0 {
            return Err(FlameGraphError::invalid(format!(
                "stack trace event {} has a zero count",
                event.stack_trace_id
            )));
        }
        let trace = self.stack_traces.get(&event.stack_trace_id).ok_or_else(|| {
            FlameGraphError::invalid(format!("unknown stack trace {}", event.stack_trace_id))
        })?;
        if trace.is_empty() {
            return Err(FlameGraphError::invalid(format!(
                "stack trace {} has no frames",
                event.stack_trace_id
            )));
        }
        for frame_id in &trace.frame_ids {
            if let Err(err) = self.directory.resolve(frame_id) {
                debug!("stack trace {} references {frame_id}: {err}", event.stack_trace_id);
                return Err(err);
            }
        }

        // Every node total is bounded by the root total
        let root_total = self.nodes[ROOT].total_count.checked_add(event.count).ok_or_else(|| {
            FlameGraphError::invalid(format!(
                "event counts overflow u64 at stack trace {}",
                event.stack_trace_id
            ))
        })?;

        self.nodes[ROOT].total_count = root_total;
        let mut current = ROOT;
        for frame_id in trace.callers_first() {
            current = self.child_or_insert(current, frame_id);
            self.nodes[current].total_count += event.count;
        }
        // `current` is now the leaf
        self.nodes[current].self_count += event.count;
        Ok(())
    }

    /// Add every event, stopping at the first error.
    ///
    /// # Errors
    /// See [`GraphBuilder::add_event`].
    pub fn add_events<'e>(
        &mut self,
        events: impl IntoIterator<Item = &'e StackTraceEvent>,
    ) -> Result<(), FlameGraphError> {
        events.into_iter().try_for_each(|event| self.add_event(event))
    }

    /// Fold another builder's counts into this one.
    ///
    /// Counts are summed at identical call paths, so merging partial graphs
    /// gives the same result in any order.
    ///
    /// # Errors
    /// `InvalidInput` if the combined total no longer fits in `u64`; `self` is
    /// left unchanged.
    pub fn merge(&mut self, other: GraphBuilder<'_>) -> Result<(), FlameGraphError> {
        let other_nodes = other.nodes;
        let root_total = self.nodes[ROOT]
            .total_count
            .checked_add(other_nodes[ROOT].total_count)
            .ok_or_else(|| FlameGraphError::invalid("merged event counts overflow u64"))?;
        self.nodes[ROOT].total_count = root_total;

        // (index in other, index in self)
        let mut pending: Vec<(NodeIndex, NodeIndex)> = vec![(ROOT, ROOT)];
        while let Some((theirs, ours)) = pending.pop() {
            for &their_child in &other_nodes[theirs].children {
                let child = &other_nodes[their_child];
                let Some(frame_id) = child.frame_id.as_ref() else { continue };
                let our_child = self.child_or_insert(ours, frame_id);
                self.nodes[our_child].total_count += child.total_count;
                self.nodes[our_child].self_count += child.self_count;
                pending.push((their_child, our_child));
            }
        }
        Ok(())
    }

    /// Sort children and freeze the graph.
    #[must_use]
    pub fn finish(self) -> CallerCalleeGraph {
        let mut nodes = self.nodes;
        for index in 0..nodes.len() {
            let mut children = std::mem::take(&mut nodes[index].children);
            children.sort_by(|&a, &b| {
                nodes[b]
                    .total_count
                    .cmp(&nodes[a].total_count)
                    .then_with(|| nodes[a].frame_id.cmp(&nodes[b].frame_id))
            });
            nodes[index].children = children;
        }
        debug!("caller-callee graph: {} nodes, {} samples", nodes.len(), nodes[ROOT].total_count);
        CallerCalleeGraph { nodes }
    }

    fn child_or_insert(&mut self, parent: NodeIndex, frame_id: &FrameId) -> NodeIndex {
        if let Some(&index) = self.edges.get(&(parent, frame_id.clone())) {
            return index;
        }
        let index = self.nodes.len();
        self.nodes.push(CallerCalleeNode::child(frame_id.clone(), parent));
        self.nodes[parent].children.push(index);
        self.edges.insert((parent, frame_id.clone()), index);
        index
    }
}

/// Build the graph in a single pass.
///
/// # Errors
/// See [`GraphBuilder::add_event`].
pub fn build_graph(
    directory: &FrameDirectory,
    stack_traces: &HashMap<StackTraceId, StackTrace>,
    events: &[StackTraceEvent],
) -> Result<CallerCalleeGraph, FlameGraphError> {
    let mut builder = GraphBuilder::new(directory, stack_traces);
    builder.add_events(events)?;
    Ok(builder.finish())
}

/// Build the graph from `partitions` slices of the events in parallel.
///
/// Each worker thread aggregates its slice into its own builder; partial
/// builders are merged in slice order and the child ordering is applied once
/// on the merged result.
///
/// # Errors
/// The error of the earliest failing slice, so the same input always reports
/// the same error.
pub fn build_graph_partitioned(
    directory: &FrameDirectory,
    stack_traces: &HashMap<StackTraceId, StackTrace>,
    events: &[StackTraceEvent],
    partitions: usize,
) -> Result<CallerCalleeGraph, FlameGraphError> {
    let partitions = partitions.clamp(1, events.len().max(1));
    if partitions == 1 {
        return build_graph(directory, stack_traces, events);
    }
    let chunk_size = events.len().div_ceil(partitions);
    debug!("aggregating {} events in {partitions} partitions", events.len());

    // Capacity covers every chunk, so workers never block on send
    let (tx, rx) = bounded(partitions);
    std::thread::scope(|scope| -> Result<CallerCalleeGraph, FlameGraphError> {
        for (slot, chunk) in events.chunks(chunk_size).enumerate() {
            let tx = tx.clone();
            scope.spawn(move || {
                let mut partial = GraphBuilder::new(directory, stack_traces);
                let result = partial.add_events(chunk).map(|()| partial);
                tx.send((slot, result)).ok();
            });
        }
        drop(tx);

        let mut results: Vec<Option<Result<GraphBuilder<'_>, FlameGraphError>>> =
            (0..events.len().div_ceil(chunk_size)).map(|_| None).collect();
        for (slot, result) in rx {
            results[slot] = Some(result);
        }

        let mut merged = GraphBuilder::new(directory, stack_traces);
        for partial in results.into_iter().flatten() {
            merged.merge(partial?)?;
        }
        Ok(merged.finish())
    })
}
