//! Display labels for flame graph nodes.
//!
//! The fetch collaborator hands over function names as the symbolizer found
//! them, which for native Rust code means mangled `_ZN...E` / `_R...` symbols.
//! Labels are what the renderer prints inside each box, so they get
//! demangled here.
//!
//! # Label Priority
//!
//! 1. **Function name** - demangled, hash suffix dropped
//! 2. **Executable + address** - unsymbolized native frames (`libc.so.6+0x2a3f0`)
//! 3. **Frame id** - nothing else is known

use rustc_demangle::demangle;
use stackfold_common::FrameId;

/// Demangle a Rust symbol; anything else is returned unchanged.
///
/// Uses the alternate format, which omits the `::h0123abcd` hash suffix.
#[must_use]
pub fn demangle_function(name: &str) -> String {
    format!("{:#}", demangle(name))
}

/// Label for one node.
#[must_use]
pub fn frame_label(
    function_name: &str,
    exe_filename: &str,
    address_or_line: u64,
    frame_id: &FrameId,
) -> String {
    if !function_name.is_empty() {
        return demangle_function(function_name);
    }
    if !exe_filename.is_empty() {
        return format!("{exe_filename}+0x{address_or_line:x}");
    }
    frame_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demangles_legacy_rust_symbol() {
        let label = demangle_function("_ZN4core3ptr13drop_in_place17h0123456789abcdefE");
        assert_eq!(label, "core::ptr::drop_in_place");
    }

    #[test]
    fn test_plain_names_pass_through() {
        assert_eq!(demangle_function("malloc"), "malloc");
        assert_eq!(demangle_function("handler.process_request"), "handler.process_request");
    }

    #[test]
    fn test_label_prefers_function_name() {
        let label = frame_label("main", "app", 0x10, &FrameId::from("f1"));
        assert_eq!(label, "main");
    }

    #[test]
    fn test_label_falls_back_to_executable_address() {
        let label = frame_label("", "libc.so.6", 0x2a3f0, &FrameId::from("f1"));
        assert_eq!(label, "libc.so.6+0x2a3f0");
    }

    #[test]
    fn test_label_falls_back_to_frame_id() {
        let label = frame_label("", "", 0, &FrameId::from("abc"));
        assert_eq!(label, "abc");
    }
}
