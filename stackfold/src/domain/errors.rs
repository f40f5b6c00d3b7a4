//! Structured error types for stackfold
//!
//! Using thiserror for automatic Display implementation and error chaining.

use stackfold_common::{ExecutableId, FrameId};
use thiserror::Error;

/// Errors raised while turning fetched events into a flame graph.
///
/// All of them describe the local input data. They are returned unchanged to
/// the caller and never retried: the same input always fails the same way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlameGraphError {
    /// Empty or malformed stack trace, zero event count, unknown stack trace
    /// reference or an out-of-range sample rate.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Frame {0} is missing from the frame directory")]
    UnresolvedFrame(FrameId),

    #[error("Executable {executable_id} referenced by frame {frame_id} is missing from the executable directory")]
    UnresolvedExecutable { executable_id: ExecutableId, frame_id: FrameId },
}

impl FlameGraphError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        FlameGraphError::InvalidInput(msg.into())
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to serialize flame graph: {0}")]
    SerializationFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
