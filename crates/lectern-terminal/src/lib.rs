//! Terminal capability handling for Lectern
//!
//! Resolves which inline graphics protocol the hosting terminal speaks,
//! probes device attributes over a raw-mode request/response exchange,
//! and fits decoded images into a character-cell budget before handing
//! them to a protocol-specific encoder.

pub mod geometry;
pub mod graphics;
pub mod probe;
pub mod protocol;
pub mod raw_mode;

pub use geometry::{fit, CellGeometry, CELL_ASPECT_RATIO};
pub use graphics::{render_image, renderer_for, ImageRenderer, ItermRenderer, KittyRenderer};
pub use probe::{
    parse_attribute_codes, request_attributes, request_response, ProbeConfig, ProbeResult,
    StdioTty, TtyDevice,
};
pub use protocol::{resolve_protocol, EnvIdentifiers, TerminalProtocol, PROTOCOL_ENV_VAR};
pub use raw_mode::RawModeGuard;

use thiserror::Error;

/// Failures of the device-attribute exchange.
///
/// Every variant is recoverable: callers fall back to
/// [`TerminalProtocol::Other`].
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("input is not an interactive terminal")]
    NonInteractive,

    #[error("terminal response timed out")]
    TimedOut,

    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}
