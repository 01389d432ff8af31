//! Inline image encoders for the supported graphics protocols

use crate::geometry::{fit, CellGeometry};
use crate::protocol::TerminalProtocol;
use crate::TerminalError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Maximum base64 payload per Kitty graphics escape
const KITTY_CHUNK_SIZE: usize = 4096;

/// Encodes a decoded image as terminal escape sequences
pub trait ImageRenderer {
    /// Produce the escape sequence drawing `img` over `geometry` cells
    fn render(&self, img: &DynamicImage, geometry: CellGeometry) -> Result<String, TerminalError>;
}

/// Kitty graphics protocol, transmitting PNG data
#[derive(Debug, Default, Clone, Copy)]
pub struct KittyRenderer;

/// iTerm2 inline images (OSC 1337)
#[derive(Debug, Default, Clone, Copy)]
pub struct ItermRenderer;

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, TerminalError> {
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

impl ImageRenderer for KittyRenderer {
    fn render(&self, img: &DynamicImage, geometry: CellGeometry) -> Result<String, TerminalError> {
        let encoded = STANDARD.encode(encode_png(img)?);
        let chunks = encoded
            .as_bytes()
            .chunks(KITTY_CHUNK_SIZE)
            .map(std::str::from_utf8)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TerminalError::Encode(e.to_string()))?;

        let mut out = String::with_capacity(encoded.len() + chunks.len() * 32);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            let more = u8::from(i < last);
            if i == 0 {
                // q=2 keeps the terminal from answering on our input stream
                out.push_str(&format!(
                    "\x1b_Ga=T,f=100,q=2,r={},c={},m={};{}\x1b\\",
                    geometry.rows, geometry.cols, more, chunk
                ));
            } else {
                out.push_str(&format!("\x1b_Gm={more};{chunk}\x1b\\"));
            }
        }
        Ok(out)
    }
}

impl ImageRenderer for ItermRenderer {
    fn render(&self, img: &DynamicImage, geometry: CellGeometry) -> Result<String, TerminalError> {
        let png = encode_png(img)?;
        Ok(format!(
            "\x1b]1337;File=inline=1;size={};width={};height={};preserveAspectRatio=1:{}\x07",
            png.len(),
            geometry.cols,
            geometry.rows,
            STANDARD.encode(&png)
        ))
    }
}

/// The renderer for `protocol`, if it has one
pub fn renderer_for(protocol: TerminalProtocol) -> Option<Box<dyn ImageRenderer>> {
    match protocol {
        TerminalProtocol::Kitty => Some(Box::new(KittyRenderer)),
        TerminalProtocol::Iterm => Some(Box::new(ItermRenderer)),
        TerminalProtocol::Other => None,
    }
}

/// Fit `img` into the cell budget and encode it for `protocol`.
///
/// Terminals without a graphics protocol get an empty string.
pub fn render_image(
    img: &DynamicImage,
    protocol: TerminalProtocol,
    available_rows: u32,
    max_cols: u32,
) -> Result<String, TerminalError> {
    let Some(renderer) = renderer_for(protocol) else {
        debug!("No image renderer for protocol {}", protocol);
        return Ok(String::new());
    };

    let geometry = fit(img.width(), img.height(), available_rows, max_cols);
    if geometry.is_empty() {
        return Ok(String::new());
    }
    renderer.render(img, geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn checkerboard(w: u32, h: u32) -> DynamicImage {
        let img = RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_other_protocol_renders_nothing() {
        let out = render_image(&checkerboard(8, 8), TerminalProtocol::Other, 10, 80).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_kitty_carries_geometry() {
        let out = render_image(&checkerboard(400, 100), TerminalProtocol::Kitty, 10, 40).unwrap();
        assert!(out.starts_with("\x1b_Ga=T,f=100,q=2,r=4,c=40,m=0;"));
        assert!(out.ends_with("\x1b\\"));
    }

    #[test]
    fn test_kitty_chunks_large_payloads() {
        // Noise compresses badly, forcing several chunks
        let img = RgbaImage::from_fn(256, 256, |x, y| {
            let v = (x.wrapping_mul(7919) ^ y.wrapping_mul(104_729)) as u8;
            Rgba([v, v.wrapping_mul(3), v.wrapping_add(91), 255])
        });
        let out = KittyRenderer
            .render(&DynamicImage::ImageRgba8(img), CellGeometry { rows: 8, cols: 16 })
            .unwrap();

        let escapes: Vec<&str> = out.split("\x1b\\").filter(|s| !s.is_empty()).collect();
        assert!(escapes.len() > 1);
        assert!(escapes[0].contains("m=1;"));
        assert!(escapes.last().unwrap().starts_with("\x1b_Gm=0;"));
        for escape in &escapes {
            let payload = escape.split(';').last().unwrap();
            assert!(payload.len() <= KITTY_CHUNK_SIZE);
        }
    }

    #[test]
    fn test_iterm_header() {
        let out = render_image(&checkerboard(100, 100), TerminalProtocol::Iterm, 10, 80).unwrap();
        assert!(out.starts_with("\x1b]1337;File=inline=1;size="));
        assert!(out.contains(";width=22;height=10;preserveAspectRatio=1:"));
        assert!(out.ends_with('\x07'));
    }
}
