//! Columnar layout of the caller-callee graph.
//!
//! The graph is flattened into parallel arrays, one entry per node, in
//! depth-first pre-order. A row only ever points back at an earlier row, so a
//! consumer can rebuild ancestry with one backward scan and can render rows
//! as they stream in.
//!
//! ```text
//! graph                      rows
//! (root)                     idx  frame  parent  total  self
//!  └─ main      15            0    main    -       15     0
//!      ├─ f2    10    ──►     1    f2      0       10    10
//!      └─ f3     5            2    f3      0        5     5
//! ```
//!
//! The synthetic root is not a row; its count is `total_count`.

use serde::Serialize;
use stackfold_common::{FrameId, FrameType};

use super::caller_callee::{CallerCalleeGraph, NodeIndex};
use crate::directory::FrameDirectory;
use crate::domain::FlameGraphError;

/// Flattened caller-callee graph.
///
/// All column vectors have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnarCallerCallee {
    /// Count of the implicit root (sum of all event counts).
    pub total_count: u64,

    pub frame_id: Vec<FrameId>,
    /// Row index of the parent; `None` for children of the implicit root.
    pub parent: Vec<Option<usize>>,
    pub count_exclusive: Vec<u64>,
    pub count_inclusive: Vec<u64>,

    // Frame metadata
    pub function_name: Vec<String>,
    pub source_filename: Vec<Option<String>>,
    pub source_line: Vec<Option<u32>>,
    pub exe_filename: Vec<String>,
    pub frame_type: Vec<FrameType>,
    pub address_or_line: Vec<u64>,
    pub inline: Vec<bool>,
}

impl ColumnarCallerCallee {
    #[must_use]
    pub fn len(&self) -> usize {
        self.frame_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame_id.is_empty()
    }

    fn with_capacity(total_count: u64, rows: usize) -> Self {
        Self {
            total_count,
            frame_id: Vec::with_capacity(rows),
            parent: Vec::with_capacity(rows),
            count_exclusive: Vec::with_capacity(rows),
            count_inclusive: Vec::with_capacity(rows),
            function_name: Vec::with_capacity(rows),
            source_filename: Vec::with_capacity(rows),
            source_line: Vec::with_capacity(rows),
            exe_filename: Vec::with_capacity(rows),
            frame_type: Vec::with_capacity(rows),
            address_or_line: Vec::with_capacity(rows),
            inline: Vec::with_capacity(rows),
        }
    }
}

/// Flatten `graph` into rows, resolving frame metadata from `directory`.
///
/// Traversal is iterative pre-order following the graph's child ordering, so
/// deep traces cannot exhaust the call stack and identical graphs always
/// produce identical rows.
///
/// # Errors
/// `UnresolvedFrame` / `UnresolvedExecutable` if `directory` is not the one
/// the graph was built against.
pub fn create_columnar(
    graph: &CallerCalleeGraph,
    directory: &FrameDirectory,
) -> Result<ColumnarCallerCallee, FlameGraphError> {
    let mut columns = ColumnarCallerCallee::with_capacity(graph.total_count(), graph.len() - 1);

    // (node, parent row); children pushed in reverse so the first child pops first
    let mut stack: Vec<(NodeIndex, Option<usize>)> =
        graph.root().children.iter().rev().map(|&child| (child, None)).collect();

    while let Some((index, parent_row)) = stack.pop() {
        let Some(node) = graph.node(index) else { continue };
        let Some(frame_id) = node.frame_id.as_ref() else { continue };
        let resolved = directory.resolve(frame_id)?;

        let row = columns.len();
        columns.frame_id.push(frame_id.clone());
        columns.parent.push(parent_row);
        columns.count_exclusive.push(node.self_count);
        columns.count_inclusive.push(node.total_count);
        columns.function_name.push(resolved.frame.function_name.clone());
        columns.source_filename.push(resolved.frame.file_name.clone());
        columns.source_line.push(resolved.frame.line);
        columns.exe_filename.push(resolved.executable.file_name.clone());
        columns.frame_type.push(resolved.frame.frame_type);
        columns.address_or_line.push(resolved.frame.address_or_line);
        columns.inline.push(resolved.frame.inline);

        stack.extend(node.children.iter().rev().map(|&child| (child, Some(row))));
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::caller_callee::build_graph;
    use stackfold_common::{
        Executable, ExecutableId, StackFrame, StackTrace, StackTraceEvent, StackTraceId,
    };
    use std::collections::HashMap;

    fn setup(stacks: &[(&str, &str)]) -> (FrameDirectory, HashMap<StackTraceId, StackTrace>) {
        let mut frames = Vec::new();
        let mut traces = HashMap::new();
        for &(id, stack) in stacks {
            let ids: Vec<FrameId> = stack.split(';').map(FrameId::from).collect();
            for frame_id in &ids {
                frames.push(StackFrame {
                    id: frame_id.clone(),
                    function_name: format!("fn_{frame_id}"),
                    file_name: Some(format!("src/{frame_id}.rs")),
                    line: Some(7),
                    executable_id: ExecutableId::from("app"),
                    frame_type: FrameType::Native,
                    ..Default::default()
                });
            }
            traces.insert(StackTraceId::from(id), StackTrace::from_callers_first(ids));
        }
        let exe = Executable { id: ExecutableId::from("app"), file_name: "app".into(), build_id: None };
        (FrameDirectory::from_records(frames, [exe]), traces)
    }

    fn columnar_for(stacks: &[(&str, &str)], events: &[StackTraceEvent]) -> ColumnarCallerCallee {
        let (directory, traces) = setup(stacks);
        let graph = build_graph(&directory, &traces, events).unwrap();
        create_columnar(&graph, &directory).unwrap()
    }

    #[test]
    fn test_rows_are_pre_order() {
        let columns = columnar_for(
            &[("A", "main;f1;f2"), ("B", "main;f1;f3"), ("C", "main;f4")],
            &[StackTraceEvent::new("A", 10), StackTraceEvent::new("B", 5), StackTraceEvent::new("C", 1)],
        );

        let ids: Vec<&str> = columns.frame_id.iter().map(FrameId::as_str).collect();
        assert_eq!(ids, vec!["main", "f1", "f2", "f3", "f4"]);
        assert_eq!(columns.parent, vec![None, Some(0), Some(1), Some(1), Some(0)]);
        assert_eq!(columns.count_inclusive, vec![16, 15, 10, 5, 1]);
        assert_eq!(columns.count_exclusive, vec![0, 0, 10, 5, 1]);
        assert_eq!(columns.total_count, 16);
    }

    #[test]
    fn test_parent_always_precedes_child() {
        let columns = columnar_for(
            &[("A", "a;b;c;d"), ("B", "a;c;b"), ("C", "x;y"), ("D", "a;b;e")],
            &[
                StackTraceEvent::new("A", 1),
                StackTraceEvent::new("B", 2),
                StackTraceEvent::new("C", 3),
                StackTraceEvent::new("D", 4),
            ],
        );
        for (row, parent) in columns.parent.iter().enumerate() {
            if let Some(p) = parent {
                assert!(*p < row, "row {row} points forward to {p}");
            }
        }
    }

    #[test]
    fn test_metadata_columns_are_filled() {
        let columns = columnar_for(&[("A", "main")], &[StackTraceEvent::new("A", 3)]);
        assert_eq!(columns.function_name, vec!["fn_main".to_string()]);
        assert_eq!(columns.source_filename, vec![Some("src/main.rs".to_string())]);
        assert_eq!(columns.source_line, vec![Some(7)]);
        assert_eq!(columns.exe_filename, vec!["app".to_string()]);
        assert_eq!(columns.frame_type, vec![FrameType::Native]);
        assert_eq!(columns.inline, vec![false]);
    }

    #[test]
    fn test_empty_graph_gives_no_rows() {
        let columns = columnar_for(&[], &[]);
        assert!(columns.is_empty());
        assert_eq!(columns.total_count, 0);
    }

    #[test]
    fn test_deep_trace_does_not_recurse() {
        let stack: Vec<String> = (0..20_000).map(|i| format!("f{i}")).collect();
        let stack = stack.join(";");
        let columns = columnar_for(&[("A", stack.as_str())], &[StackTraceEvent::new("A", 1)]);
        assert_eq!(columns.len(), 20_000);
        assert_eq!(columns.parent[19_999], Some(19_998));
    }
}
