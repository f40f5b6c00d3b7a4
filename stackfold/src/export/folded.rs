//! Collapsed ("folded") stack output.
//!
//! One line per node with a non-zero self count: the labels from the
//! outermost caller down to the node joined by `;`, a space, then the raw
//! self count. Rows arrive in pre-order, so the current path is kept as a
//! stack truncated to each row's depth.
//!
//! `;` inside a label (`<[u8; 32] as Trait>::f`) is written as `:` so every
//! frame stays one path element.

use std::io::Write;

use crate::analysis::ElasticFlameGraph;
use crate::domain::ExportError;

/// Folded stack exporter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FoldedExporter;

impl FoldedExporter {
    /// # Errors
    /// Returns an error if the graph's depth column is inconsistent or the
    /// write fails.
    pub fn export<W: Write>(self, graph: &ElasticFlameGraph, mut writer: W) -> Result<(), ExportError> {
        let mut path: Vec<String> = Vec::new();
        for row in 0..graph.size {
            let depth = graph.depth[row] as usize;
            if depth == 0 || depth > path.len() + 1 {
                return Err(ExportError::SerializationFailed(format!(
                    "row {row} has depth {depth} after a path of length {}",
                    path.len()
                )));
            }
            path.truncate(depth - 1);
            path.push(graph.label[row].replace(';', ":"));

            let count = graph.count_exclusive[row];
            if count > 0 {
                writeln!(writer, "{} {count}", path.join(";"))?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}
