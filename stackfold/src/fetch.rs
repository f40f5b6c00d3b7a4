//! Fetch result models
//!
//! This module contains the shape the data-fetch collaborator delivers: the
//! stack trace events of one query plus the metadata needed to resolve them.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use stackfold_common::{
    Executable, ExecutableId, FrameId, StackFrame, StackTrace, StackTraceEvent, StackTraceId,
};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::directory::FrameDirectory;
use crate::sampling::EventsIndex;

/// Everything one query returned, as a single document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    #[serde(default)]
    pub stack_trace_events: Vec<StackTraceEvent>,
    #[serde(default)]
    pub stack_traces: HashMap<StackTraceId, StackTrace>,
    #[serde(default)]
    pub stack_frames: HashMap<FrameId, StackFrame>,
    #[serde(default)]
    pub executables: HashMap<ExecutableId, Executable>,
    #[serde(default)]
    pub events_index: EventsIndex,
    /// Sum of `count` over all events, as reported by the fetch side.
    #[serde(default)]
    pub total_count: u64,
}

/// The per-request part of a fetch result (everything but the directory).
#[derive(Debug, Clone, Default)]
pub struct FetchedEvents {
    pub stack_trace_events: Vec<StackTraceEvent>,
    pub stack_traces: HashMap<StackTraceId, StackTrace>,
    pub events_index: EventsIndex,
    pub total_count: u64,
}

impl FetchedEvents {
    /// Sum of event counts, saturating.
    #[must_use]
    pub fn event_count_sum(&self) -> u64 {
        self.stack_trace_events.iter().fold(0u64, |acc, e| acc.saturating_add(e.count))
    }

    /// Compare the reported `total_count` with the events actually present.
    ///
    /// Returns the event sum, which is what the pipeline aggregates.
    pub fn checked_total_count(&self) -> u64 {
        let sum = self.event_count_sum();
        if sum != self.total_count {
            warn!(
                "fetch reported totalCount {} but events sum to {sum}; using the event sum",
                self.total_count
            );
        }
        sum
    }
}

impl FetchResult {
    /// Parse a fetch result JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid fetch
    /// result document.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fetch result {}", path.display()))?;
        let fetch: FetchResult = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fetch result {}", path.display()))?;
        fetch.log_summary();
        Ok(fetch)
    }

    /// Parse a fetch result from any reader (e.g. stdin).
    ///
    /// # Errors
    /// Returns an error if reading fails or the document is malformed.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content).context("Failed to read fetch result")?;
        let fetch: FetchResult =
            serde_json::from_str(&content).context("Failed to parse fetch result")?;
        fetch.log_summary();
        Ok(fetch)
    }

    /// Split into per-request events and the shared directory.
    #[must_use]
    pub fn into_parts(self) -> (FetchedEvents, FrameDirectory) {
        let directory = FrameDirectory::new(self.stack_frames, self.executables);
        let events = FetchedEvents {
            stack_trace_events: self.stack_trace_events,
            stack_traces: self.stack_traces,
            events_index: self.events_index,
            total_count: self.total_count,
        };
        (events, directory)
    }

    fn log_summary(&self) {
        info!(
            "fetch result: {} events, {} traces, {} frames, {} executables from {} (rate {})",
            self.stack_trace_events.len(),
            self.stack_traces.len(),
            self.stack_frames.len(),
            self.executables.len(),
            self.events_index.name,
            self.events_index.sample_rate,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "stackTraceEvents": [
            {"stackTraceId": "t1", "count": 3},
            {"stackTraceId": "t2", "count": 2}
        ],
        "stackTraces": {
            "t1": {"frameIds": ["leaf", "main"]},
            "t2": {"frameIds": ["main"]}
        },
        "stackFrames": {
            "main": {"id": "main", "functionName": "main", "executableId": "app", "frameType": "native"},
            "leaf": {"id": "leaf", "functionName": "leaf", "executableId": "app", "fileName": "src/leaf.rs", "line": 12}
        },
        "executables": {
            "app": {"id": "app", "fileName": "app"}
        },
        "eventsIndex": {"name": "profiling-events-5pow01", "sampleRate": 0.2},
        "totalCount": 5
    }"#;

    #[test]
    fn test_parse_fetch_document() {
        let fetch = FetchResult::from_reader(DOC.as_bytes()).unwrap();
        assert_eq!(fetch.stack_trace_events.len(), 2);
        assert_eq!(fetch.stack_traces[&StackTraceId::from("t1")].leaf(), Some(&FrameId::from("leaf")));
        assert_eq!(fetch.stack_frames[&FrameId::from("leaf")].line, Some(12));
        assert_eq!(fetch.events_index.name, "profiling-events-5pow01");
        assert_eq!(fetch.total_count, 5);
    }

    #[test]
    fn test_into_parts_builds_directory() {
        let (events, directory) = FetchResult::from_reader(DOC.as_bytes()).unwrap().into_parts();
        assert_eq!(directory.frame_count(), 2);
        assert_eq!(directory.executable_count(), 1);
        assert!(directory.resolve(&FrameId::from("leaf")).is_ok());
        assert_eq!(events.checked_total_count(), 5);
    }

    #[test]
    fn test_event_sum_wins_over_reported_total() {
        let events = FetchedEvents {
            stack_trace_events: vec![StackTraceEvent::new("t1", 4)],
            total_count: 10,
            ..Default::default()
        };
        assert_eq!(events.checked_total_count(), 4);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let fetch = FetchResult::from_reader(&b"{}"[..]).unwrap();
        assert!(fetch.stack_trace_events.is_empty());
        assert_eq!(fetch.events_index, EventsIndex::full());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(FetchResult::from_reader(&b"{\"stackTraceEvents\": 3}"[..]).is_err());
    }
}
