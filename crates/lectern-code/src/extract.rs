//! Fenced code block extraction

use crate::annotation::strip_annotation_markers;
use crate::ParseError;
use tracing::debug;

/// Fence delimiters; a block must be closed by the style that opened it
pub(crate) const FENCES: [&str; 2] = ["```", "~~~"];

/// A runnable fragment pulled out of a slide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Body with annotation markers stripped
    pub code: String,
    /// Language token as written after the opening fence
    pub language: String,
}

impl CodeBlock {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
        }
    }
}

/// If `line` opens a fence, its marker and language token (possibly empty).
pub(crate) fn opening_fence(line: &str) -> Option<(&'static str, &str)> {
    let line = line.trim();
    FENCES.iter().find_map(|&marker| {
        let info = line.strip_prefix(marker)?;
        let marker_char = marker.chars().next()?;
        let language = info
            .trim_start_matches(marker_char)
            .split_whitespace()
            .next()
            .unwrap_or("");
        Some((marker, language))
    })
}

/// Whether `line` closes a fence opened with `marker`.
pub(crate) fn is_closing_fence(line: &str, marker: &str) -> bool {
    let line = line.trim();
    match marker.chars().next() {
        Some(c) => line.starts_with(marker) && line.trim_start_matches(c).is_empty(),
        None => false,
    }
}

struct OpenFence<'a> {
    marker: &'static str,
    language: &'a str,
    line: usize,
    body_start: usize,
}

/// Extract every fenced block carrying a language token, in source order.
///
/// Fences without a language and fences with a blank body are skipped.
/// A fence left open at the end of the text is never returned; it is
/// reported as [`ParseError::UnclosedFence`] only when nothing else parsed.
pub fn parse(text: &str) -> Result<Vec<CodeBlock>, ParseError> {
    let mut blocks = Vec::new();
    let mut open: Option<OpenFence<'_>> = None;
    let mut offset = 0;

    for (idx, raw_line) in text.split_inclusive('\n').enumerate() {
        let line_start = offset;
        offset += raw_line.len();

        match open.take() {
            None => {
                if let Some((marker, language)) = opening_fence(raw_line) {
                    open = Some(OpenFence {
                        marker,
                        language,
                        line: idx + 1,
                        body_start: offset,
                    });
                }
            }
            Some(fence) if is_closing_fence(raw_line, fence.marker) => {
                let body = trim_final_newline(&text[fence.body_start..line_start]);
                if fence.language.is_empty() || body.trim().is_empty() {
                    debug!("Skipping fence on line {} without language or body", fence.line);
                    continue;
                }
                blocks.push(CodeBlock::new(fence.language, strip_annotation_markers(body)));
            }
            Some(fence) => open = Some(fence),
        }
    }

    if let Some(fence) = open {
        debug!("Fence opened on line {} is never closed", fence.line);
        if blocks.is_empty() && !fence.language.is_empty() {
            return Err(ParseError::UnclosedFence {
                language: fence.language.to_owned(),
                line: fence.line,
            });
        }
    }

    if blocks.is_empty() {
        return Err(ParseError::NoCodeBlock);
    }
    Ok(blocks)
}

fn trim_final_newline(body: &str) -> &str {
    match body.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => body,
    }
}
