//! Built-in pseudo-languages that render instead of running a process

use crate::engine::{ExecutionResult, RenderContext, EXIT_INTERNAL_ERROR};
use crate::extract::CodeBlock;
use crate::CodeError;
use crossterm::style::{style, Color, Stylize};
use lectern_terminal::render_image;
use qrcode::{EcLevel, QrCode};
use std::path::PathBuf;
use tracing::{debug, warn};
use unicode_width::UnicodeWidthStr;

/// Block body is an image path
pub const IMAGE_LANGUAGE: &str = "img";

/// Block body is one QR payload per line
pub const QR_LANGUAGE: &str = "qr";

/// Light modules surrounding each code
const QR_QUIET_ZONE: isize = 1;

/// Blank columns to the right of each QR unit
const QR_PADDING: usize = 8;

const QR_LABEL_COLOR: Color = Color::Rgb {
    r: 0x41,
    g: 0x69,
    b: 0xE1,
};

/// Languages rendered as soon as their slide is shown
pub fn is_auto_execute(language: &str) -> bool {
    matches!(language, IMAGE_LANGUAGE | QR_LANGUAGE)
}

pub(crate) fn render_image_block(
    block: &CodeBlock,
    ctx: &RenderContext,
) -> Result<ExecutionResult, CodeError> {
    let path = PathBuf::from(block.code.trim());
    let img = image::open(&path).map_err(|source| CodeError::Image {
        path: path.clone(),
        source,
    })?;

    debug!(
        "Rendering {:?} ({}x{}) for {}",
        path,
        img.width(),
        img.height(),
        ctx.protocol
    );
    let output = render_image(&img, ctx.protocol, ctx.available_rows, ctx.max_cols)?;
    Ok(ExecutionResult::completed(output))
}

/// A rendered column of lines with a known display width
struct Unit {
    lines: Vec<(String, usize)>,
    width: usize,
}

impl Unit {
    fn new(lines: Vec<(String, usize)>) -> Self {
        let width = lines.iter().map(|(_, w)| *w).max().unwrap_or(0) + QR_PADDING;
        Self { lines, width }
    }
}

/// Half-block rendering of a QR code for dark terminal backgrounds.
///
/// Light modules are drawn, dark modules are left as background; every
/// character cell covers two module rows.
fn qr_glyph_rows(code: &QrCode) -> Vec<String> {
    let width = code.width() as isize;
    let colors = code.to_colors();
    let size = width + 2 * QR_QUIET_ZONE;

    let lit = |x: isize, y: isize| -> bool {
        if x < 0 || y < 0 || x >= size || y >= size {
            return false;
        }
        let (mx, my) = (x - QR_QUIET_ZONE, y - QR_QUIET_ZONE);
        if mx < 0 || my < 0 || mx >= width || my >= width {
            return true;
        }
        colors[(my * width + mx) as usize] == qrcode::Color::Light
    };

    (0..size)
        .step_by(2)
        .map(|y| {
            (0..size)
                .map(|x| match (lit(x, y), lit(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                })
                .collect()
        })
        .collect()
}

fn qr_unit(payload: &str) -> Result<Unit, String> {
    let code = QrCode::with_error_correction_level(payload.trim().as_bytes(), EcLevel::L)
        .map_err(|e| format!("Error: could not generate QR code: {e}"))?;

    let mut lines: Vec<(String, usize)> = qr_glyph_rows(&code)
        .into_iter()
        .map(|row| {
            let w = row.width();
            (row, w)
        })
        .collect();
    lines.push((style(payload).with(QR_LABEL_COLOR).to_string(), payload.width()));
    Ok(Unit::new(lines))
}

/// Lay units out left to right, top aligned, each padded to its width
fn join_horizontal(units: &[Unit]) -> String {
    let height = units.iter().map(|u| u.lines.len()).max().unwrap_or(0);
    let mut rows = Vec::with_capacity(height);

    for row in 0..height {
        let mut line = String::new();
        for unit in units {
            let (text, w) = unit
                .lines
                .get(row)
                .map(|(t, w)| (t.as_str(), *w))
                .unwrap_or(("", 0));
            line.push_str(text);
            line.push_str(&" ".repeat(unit.width.saturating_sub(w)));
        }
        rows.push(line);
    }
    rows.join("\n")
}

/// One QR unit per payload line, laid out left to right.
///
/// Blank payload lines are skipped rather than encoded as empty codes.
pub(crate) fn render_qr_block(block: &CodeBlock) -> ExecutionResult {
    let mut exit_code = 0;
    let units: Vec<Unit> = block
        .code
        .split('\n')
        .filter(|payload| !payload.trim().is_empty())
        .map(|payload| {
            qr_unit(payload).unwrap_or_else(|message| {
                warn!("{}", message);
                exit_code = EXIT_INTERNAL_ERROR;
                let w = message.width();
                Unit::new(vec![(message, w)])
            })
        })
        .collect();

    ExecutionResult {
        exit_code,
        ..ExecutionResult::completed(join_horizontal(&units))
    }
}
