//! Flame graph export
//!
//! This module writes an assembled flame graph in one of two formats:
//! - **JSON**: the full `ElasticFlameGraph` payload for the response layer
//! - **Folded**: `a;b;c 42` collapsed stacks for inferno / flamegraph.pl

pub mod folded;
pub mod json;

pub use folded::FoldedExporter;
pub use json::JsonExporter;

use std::io::Write;

use crate::analysis::ElasticFlameGraph;
use crate::domain::ExportError;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Folded,
}

/// Write `graph` to `writer` in `format`.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub fn export<W: Write>(
    graph: &ElasticFlameGraph,
    format: ExportFormat,
    pretty: bool,
    writer: W,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Json => JsonExporter::new(pretty).export(graph, writer),
        ExportFormat::Folded => FoldedExporter.export(graph, writer),
    }
}
