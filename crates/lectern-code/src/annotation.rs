//! Annotation markers
//!
//! A line starting with `///` is shown to the code engine but hidden from
//! the audience. The two filters below work on different copies of the
//! slide and deliberately disagree: the display copy loses whole lines,
//! the executable copy loses only the marker.

use crate::extract::{is_closing_fence, opening_fence};

/// Reserved annotation marker
pub const ANNOTATION_MARKER: &str = "///";

/// Whether `line` is an annotation line
pub fn is_annotation(line: &str) -> bool {
    line.trim_start().starts_with(ANNOTATION_MARKER)
}

struct PendingFence {
    marker: &'static str,
    buffer: String,
    has_content: bool,
}

/// Remove annotation lines for display.
///
/// Fenced regions left with nothing but blank lines disappear entirely,
/// fences included. A fence that is never closed is kept as written.
pub fn hide_annotations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut fence: Option<PendingFence> = None;

    for line in text.split_inclusive('\n') {
        if is_annotation(line) {
            continue;
        }

        match fence.as_mut() {
            None => {
                match opening_fence(line) {
                    Some((marker, _)) => {
                        fence = Some(PendingFence {
                            marker,
                            buffer: line.to_owned(),
                            has_content: false,
                        });
                    }
                    None => out.push_str(line),
                }
                continue;
            }
            Some(pending) => {
                pending.buffer.push_str(line);
                if !is_closing_fence(line, pending.marker) {
                    pending.has_content |= !line.trim().is_empty();
                    continue;
                }
            }
        }

        if let Some(closed) = fence.take() {
            if closed.has_content {
                out.push_str(&closed.buffer);
            }
        }
    }

    if let Some(unclosed) = fence {
        out.push_str(&unclosed.buffer);
    }
    out
}

/// Remove the marker token wherever it occurs, keeping the rest of each line.
pub fn strip_annotation_markers(content: &str) -> String {
    content.replace(ANNOTATION_MARKER, "")
}
