//! # stackfold - Flame Graphs from Sampled Stack Traces
//!
//! stackfold turns the result of one profiling query (stack trace events,
//! the traces they point at, and the frame/executable metadata) into a
//! weighted flame graph. The output is columnar so a renderer can stream
//! rows without rebuilding a tree.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Fetch collaborator (JSON)                      │
//! │   events + traces + frames + executables + events index         │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ FetchResult
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   stackfold (This Crate)                        │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │  │  Aggregate   │──▶│  Columnarize │──▶│   Assemble   │        │
//! │  │ (call graph) │   │  (pre-order) │   │   (layout)   │        │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘        │
//! │         │                   │                 │                 │
//! │         └──── FrameDirectory┘                 ▼                 │
//! │                                        ┌──────────────┐        │
//! │                                        │   Correct    │        │
//! │                                        │  (sampling)  │        │
//! │                                        └──────┬───────┘        │
//! │                                               ▼                 │
//! │                                        ┌──────────────┐        │
//! │                                        │    Export    │        │
//! │                                        │ json/folded  │        │
//! │                                        └──────────────┘        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`fetch`]: the fetch result document and its split into per-request
//!   events and the shared [`directory::FrameDirectory`]
//! - [`analysis`]: caller-callee aggregation, columnar flattening and flame
//!   graph assembly
//! - [`sampling`]: events index selection and the downsampling correction
//! - [`pipeline`]: runs the stages in order and reports per-stage timings to
//!   an injected observer
//! - [`labels`]: demangled display labels
//! - [`export`]: JSON and folded-stack writers
//! - [`cli`]: command-line arguments
//! - [`domain`]: error types, sample rates and query windows
//!
//! ## Typical Usage
//!
//! ```bash
//! # JSON flame graph for a 15 minute query
//! stackfold fetch.json --total-seconds 900 -o flamegraph.json
//!
//! # Collapsed stacks for inferno
//! stackfold fetch.json --format folded | inferno-flamegraph > fg.svg
//! ```
//!
//! ## Key Concepts
//!
//! - **Stack trace**: frame ids stored leaf-first, as the profiler captured them
//! - **Events index**: which downsampled copy of the events table was read;
//!   rate `1/5^N` for index `profiling-events-5powNN`
//! - **Inclusive / exclusive count**: samples passing through a node vs.
//!   samples whose leaf is the node

pub mod analysis;
pub mod cli;
pub mod directory;
pub mod domain;
pub mod export;
pub mod fetch;
pub mod labels;
pub mod pipeline;
pub mod sampling;
