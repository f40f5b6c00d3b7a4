//! Flame graph assembly from the columnar layout.
//!
//! Everything here is derived from the columnar arrays alone; the
//! caller-callee graph is never consulted. Counts are copied through
//! unchanged, only layout fields are added:
//!
//! ```text
//! depth   1 ┌──────────────── main (1.0) ────────────────┐
//!         2 ┌────────── f1 (0.66) ─────────┐┌─ f4 (0.33)─┐
//!         3 ┌─ f2 (0.33) ─┐┌─ f3 (0.33) ──┐
//!           ^ offset 0.0   ^ offset 0.33
//! ```
//!
//! `width` is `count_inclusive / total`, `offset` is where the box starts on
//! the x axis, both as fractions of the whole graph.

// Widths are ratios of sample counts
#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};
use stackfold_common::{FrameId, FrameType};

use super::columnar::ColumnarCallerCallee;
use crate::domain::FlameGraphError;
use crate::labels::frame_label;

/// Flame graph payload handed to the response layer.
///
/// Per-node counts are raw sample counts from the events table that was
/// read. Only `total_traces` is scaled for downsampling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ElasticFlameGraph {
    /// Number of nodes (length of every per-node column).
    pub size: usize,

    // Structure
    pub frame_id: Vec<FrameId>,
    pub parent: Vec<Option<usize>>,
    pub depth: Vec<u32>,
    pub count_inclusive: Vec<u64>,
    pub count_exclusive: Vec<u64>,

    // Layout
    pub label: Vec<String>,
    pub width: Vec<f64>,
    pub self_width: Vec<f64>,
    pub offset: Vec<f64>,

    // Frame metadata
    pub function_name: Vec<String>,
    pub source_filename: Vec<Option<String>>,
    pub source_line: Vec<Option<u32>>,
    pub exe_filename: Vec<String>,
    pub frame_type: Vec<FrameType>,
    pub address_or_line: Vec<u64>,
    pub inline: Vec<bool>,

    // Totals
    /// Length of the query window in seconds.
    pub total_seconds: f64,
    /// Estimated population count (`sampled_traces` scaled by the sample rate).
    pub total_traces: u64,
    /// Sum of the event counts actually read.
    pub sampled_traces: u64,
}

impl ElasticFlameGraph {
    /// True when no events matched; all totals are then zero as well.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Compute layout fields for every row.
///
/// `total_traces` and `total_seconds` are left at zero for the sampling
/// correction to fill in; `sampled_traces` is the columnar root count.
///
/// # Errors
/// `InvalidInput` if the columns have different lengths or a row refers to a
/// parent at or after itself.
pub fn assemble(columnar: ColumnarCallerCallee) -> Result<ElasticFlameGraph, FlameGraphError> {
    let rows = columnar.len();
    validate(&columnar)?;

    let total = columnar.total_count;
    if total == 0 {
        return Ok(ElasticFlameGraph::default());
    }
    let total_f = total as f64;

    let mut depth = Vec::with_capacity(rows);
    let mut width = Vec::with_capacity(rows);
    let mut self_width = Vec::with_capacity(rows);
    let mut offset = Vec::with_capacity(rows);
    let mut label = Vec::with_capacity(rows);
    // x position where the next child of each row starts
    let mut next_child = vec![0.0_f64; rows];
    let mut next_top_level = 0.0_f64;

    for row in 0..rows {
        let w = columnar.count_inclusive[row] as f64 / total_f;
        let (d, x) = match columnar.parent[row] {
            None => {
                let x = next_top_level;
                next_top_level += w;
                (1, x)
            }
            Some(p) => {
                let x = next_child[p];
                next_child[p] += w;
                (depth[p] + 1, x)
            }
        };
        next_child[row] = x;

        depth.push(d);
        width.push(w);
        self_width.push(columnar.count_exclusive[row] as f64 / total_f);
        offset.push(x);
        label.push(frame_label(
            &columnar.function_name[row],
            &columnar.exe_filename[row],
            columnar.address_or_line[row],
            &columnar.frame_id[row],
        ));
    }

    Ok(ElasticFlameGraph {
        size: rows,
        frame_id: columnar.frame_id,
        parent: columnar.parent,
        depth,
        count_inclusive: columnar.count_inclusive,
        count_exclusive: columnar.count_exclusive,
        label,
        width,
        self_width,
        offset,
        function_name: columnar.function_name,
        source_filename: columnar.source_filename,
        source_line: columnar.source_line,
        exe_filename: columnar.exe_filename,
        frame_type: columnar.frame_type,
        address_or_line: columnar.address_or_line,
        inline: columnar.inline,
        total_seconds: 0.0,
        total_traces: 0,
        sampled_traces: total,
    })
}

fn validate(columnar: &ColumnarCallerCallee) -> Result<(), FlameGraphError> {
    let rows = columnar.len();
    let lengths = [
        columnar.parent.len(),
        columnar.count_exclusive.len(),
        columnar.count_inclusive.len(),
        columnar.function_name.len(),
        columnar.source_filename.len(),
        columnar.source_line.len(),
        columnar.exe_filename.len(),
        columnar.frame_type.len(),
        columnar.address_or_line.len(),
        columnar.inline.len(),
    ];
    if lengths.iter().any(|&len| len != rows) {
        return Err(FlameGraphError::invalid("columnar graph has columns of different lengths"));
    }
    for (row, parent) in columnar.parent.iter().enumerate() {
        if let Some(p) = *parent {
            if p >= row {
                return Err(FlameGraphError::invalid(format!(
                    "row {row} refers to parent row {p} that does not precede it"
                )));
            }
        }
    }
    Ok(())
}
