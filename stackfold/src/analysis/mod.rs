//! Analysis logic for profiling data
//!
//! This module contains the pure aggregation and layout stages, separated
//! from input loading and export:
//!
//! - [`caller_callee`]: events → caller-callee graph
//! - [`columnar`]: graph → pre-order parallel arrays
//! - [`flame_graph`]: arrays → weighted flame graph

pub mod caller_callee;
pub mod columnar;
pub mod flame_graph;

pub use caller_callee::{
    build_graph, build_graph_partitioned, CallerCalleeGraph, CallerCalleeNode, GraphBuilder,
};
pub use columnar::{create_columnar, ColumnarCallerCallee};
pub use flame_graph::{assemble, ElasticFlameGraph};
