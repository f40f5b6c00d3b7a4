//! # Shared Data Model (Fetch Collaborator ↔ Pipeline)
//!
//! Defines the identifiers and records that the data-fetch collaborator hands
//! to the flame graph pipeline. Everything here is plain, immutable data:
//! no lookups, no aggregation. The crate is `no_std` (with `alloc`) so the
//! same definitions can be shared by any fetch client.
//!
//! ## Key Types
//!
//! - [`FrameId`] / [`ExecutableId`] / [`StackTraceId`] - opaque content-hash identifiers
//! - [`StackFrame`] - symbolized frame metadata
//! - [`Executable`] - binary/module metadata
//! - [`StackTrace`] - frame sequence, stored **leaf first**
//! - [`StackTraceEvent`] - a trace reference plus its observed sample count
//!
//! Enable the `serde` feature for (de)serialization in the camelCase shape the
//! fetch collaborator produces.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

// ============================================================================
// Downsampling Constants
// ============================================================================

/// Each coarser events table keeps one in `DOWNSAMPLE_FACTOR` samples of the
/// previous one, so table `N` has sample rate `1 / 5^N`.
pub const DOWNSAMPLE_FACTOR: u64 = 5;

/// Coarsest downsampled events table (`profiling-events-5pow11`).
pub const MAX_DOWNSAMPLE_EXPONENT: u32 = 11;

/// Default number of samples the fetch collaborator aims for when choosing an
/// events table.
pub const DEFAULT_TARGET_SAMPLE_SIZE: u64 = 20_000;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(String::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a stack frame.
    ///
    /// Content hash of (executable, address-or-line), so two samples that hit
    /// the same function at the same location share a `FrameId`. Ordering is
    /// lexicographic and is used to break ties when sorting call graph
    /// children.
    FrameId
);

opaque_id!(
    /// Identifier of an executable or module (one per distinct binary).
    ExecutableId
);

opaque_id!(
    /// Identifier of a stack trace (one per distinct frame sequence).
    StackTraceId
);

// ============================================================================
// Frame Metadata
// ============================================================================

/// Kind of code a frame was sampled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FrameType {
    /// Not symbolized yet (only executable + address known)
    #[default]
    Unsymbolized,
    Native,
    Kernel,
    Python,
    Php,
    Jvm,
    Ruby,
    Perl,
    JavaScript,
    DotNet,
}

impl FrameType {
    /// Returns true for frames executed as machine code (native or kernel).
    #[must_use]
    pub fn is_native(self) -> bool {
        matches!(self, FrameType::Native | FrameType::Kernel | FrameType::Unsymbolized)
    }
}

/// A symbolized stack frame.
///
/// Immutable once created; shared read-only by every request that references
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct StackFrame {
    pub id: FrameId,

    /// Function name as reported by the symbolizer (may be mangled, may be
    /// empty for unsymbolized frames).
    #[cfg_attr(feature = "serde", serde(default))]
    pub function_name: String,

    /// Source file, when debug info was available.
    #[cfg_attr(feature = "serde", serde(default))]
    pub file_name: Option<String>,

    /// Source line, when debug info was available.
    #[cfg_attr(feature = "serde", serde(default))]
    pub line: Option<u32>,

    /// Executable the frame belongs to.
    pub executable_id: ExecutableId,

    #[cfg_attr(feature = "serde", serde(default))]
    pub frame_type: FrameType,

    /// Instruction address (native frames) or line (interpreted frames).
    #[cfg_attr(feature = "serde", serde(default))]
    pub address_or_line: u64,

    /// Frame was inlined into its caller by the compiler.
    #[cfg_attr(feature = "serde", serde(default))]
    pub inline: bool,
}

/// An executable or shared module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Executable {
    pub id: ExecutableId,

    /// File name of the binary (e.g. `libc.so.6`); empty if unknown.
    #[cfg_attr(feature = "serde", serde(default))]
    pub file_name: String,

    /// Build identifier (GNU build-id or similar).
    #[cfg_attr(feature = "serde", serde(default))]
    pub build_id: Option<String>,
}

// ============================================================================
// Stack Traces and Events
// ============================================================================

/// An ordered frame sequence.
///
/// **Convention**: `frame_ids[0]` is the leaf (where the sample was taken);
/// the last element is the outermost caller. This is the order the fetch
/// collaborator stores traces in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct StackTrace {
    pub frame_ids: Vec<FrameId>,
}

impl StackTrace {
    /// Create a trace from leaf-first frame ids.
    #[must_use]
    pub fn new(frame_ids: Vec<FrameId>) -> Self {
        Self { frame_ids }
    }

    /// Create a trace from caller-first frame ids (outermost frame first).
    #[must_use]
    pub fn from_callers_first(mut frame_ids: Vec<FrameId>) -> Self {
        frame_ids.reverse();
        Self { frame_ids }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frame_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame_ids.is_empty()
    }

    /// The sampled frame, if any.
    #[must_use]
    pub fn leaf(&self) -> Option<&FrameId> {
        self.frame_ids.first()
    }

    /// Frames from the outermost caller inward to the leaf.
    pub fn callers_first(&self) -> impl DoubleEndedIterator<Item = &FrameId> + ExactSizeIterator {
        self.frame_ids.iter().rev()
    }
}

/// A stack trace observed `count` times in the events table it was read
/// from.
///
/// When that table is downsampled, `count` is the downsampled count, not the
/// population count.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct StackTraceEvent {
    pub stack_trace_id: StackTraceId,
    pub count: u64,
}

impl StackTraceEvent {
    #[must_use]
    pub fn new(stack_trace_id: impl Into<StackTraceId>, count: u64) -> Self {
        Self { stack_trace_id: stack_trace_id.into(), count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_callers_first_walks_from_outermost_frame() {
        let trace = StackTrace::new(vec![FrameId::from("leaf"), FrameId::from("mid"), FrameId::from("main")]);

        let order: Vec<&str> = trace.callers_first().map(FrameId::as_str).collect();
        assert_eq!(order, vec!["main", "mid", "leaf"]);
        assert_eq!(trace.leaf().map(FrameId::as_str), Some("leaf"));
    }

    #[test]
    fn test_from_callers_first_stores_leaf_first() {
        let trace = StackTrace::from_callers_first(vec![FrameId::from("main"), FrameId::from("work")]);
        assert_eq!(trace.frame_ids[0], FrameId::from("work"));
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn test_frame_id_ordering_is_lexicographic() {
        assert!(FrameId::from("a") < FrameId::from("b"));
        assert!(FrameId::from("ab") > FrameId::from("a"));
    }

    #[test]
    fn test_frame_type_is_native() {
        assert!(FrameType::Native.is_native());
        assert!(FrameType::Kernel.is_native());
        assert!(!FrameType::Python.is_native());
    }
}
