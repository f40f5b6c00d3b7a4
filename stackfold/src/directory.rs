//! Frame and executable lookup tables.
//!
//! The directory is filled once from the fetch collaborator's metadata and
//! then only read. It owns plain maps keyed by value-typed identifiers, so a
//! single instance can be shared by reference across threads and requests.

use std::collections::HashMap;

use stackfold_common::{Executable, ExecutableId, FrameId, StackFrame};

use crate::domain::FlameGraphError;

/// A frame together with the executable it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedFrame<'a> {
    pub frame: &'a StackFrame,
    pub executable: &'a Executable,
}

/// Read-only frame/executable metadata.
#[derive(Debug, Clone, Default)]
pub struct FrameDirectory {
    frames: HashMap<FrameId, StackFrame>,
    executables: HashMap<ExecutableId, Executable>,
}

impl FrameDirectory {
    /// Create a directory from maps keyed by identifier.
    #[must_use]
    pub fn new(
        frames: HashMap<FrameId, StackFrame>,
        executables: HashMap<ExecutableId, Executable>,
    ) -> Self {
        Self { frames, executables }
    }

    /// Create a directory keyed by each record's own id.
    pub fn from_records(
        frames: impl IntoIterator<Item = StackFrame>,
        executables: impl IntoIterator<Item = Executable>,
    ) -> Self {
        Self {
            frames: frames.into_iter().map(|f| (f.id.clone(), f)).collect(),
            executables: executables.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    #[must_use]
    pub fn frame(&self, id: &FrameId) -> Option<&StackFrame> {
        self.frames.get(id)
    }

    #[must_use]
    pub fn executable(&self, id: &ExecutableId) -> Option<&Executable> {
        self.executables.get(id)
    }

    /// Look up a frame and its executable.
    ///
    /// # Errors
    /// `UnresolvedFrame` if the frame is unknown, `UnresolvedExecutable` if the
    /// frame points at an unknown executable.
    pub fn resolve(&self, id: &FrameId) -> Result<ResolvedFrame<'_>, FlameGraphError> {
        let frame = self.frame(id).ok_or_else(|| FlameGraphError::UnresolvedFrame(id.clone()))?;
        let executable = self.executable(&frame.executable_id).ok_or_else(|| {
            FlameGraphError::UnresolvedExecutable {
                executable_id: frame.executable_id.clone(),
                frame_id: id.clone(),
            }
        })?;
        Ok(ResolvedFrame { frame, executable })
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn executable_count(&self) -> usize {
        self.executables.len()
    }
}
