//! Live code execution for Lectern
//!
//! Extracts fenced code blocks from slide text, runs them through external
//! interpreters and compilers, and renders the `img` and `qr` built-ins.

pub mod annotation;
pub mod builtin;
pub mod engine;
pub mod extract;
pub mod language;

pub use annotation::{hide_annotations, is_annotation, strip_annotation_markers, ANNOTATION_MARKER};
pub use builtin::{is_auto_execute, IMAGE_LANGUAGE, QR_LANGUAGE};
pub use engine::{EngineConfig, ExecutionEngine, ExecutionResult, RenderContext, EXIT_INTERNAL_ERROR};
pub use extract::{parse, CodeBlock};
pub use language::{LanguageRegistry, LanguageSpec};

use lectern_terminal::TerminalError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a slide yielded no code blocks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("could not parse code block: no code block found")]
    NoCodeBlock,

    #[error("could not parse code block: `{language}` fence opened on line {line} is never closed")]
    UnclosedFence { language: String, line: usize },
}

#[derive(Error, Debug)]
pub enum CodeError {
    #[error("Failed to open image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to render image: {0}")]
    Render(#[from] TerminalError),

    #[error("Invalid language configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
