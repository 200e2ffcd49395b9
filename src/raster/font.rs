//! Bitmap glyphs for the raster back end.
//!
//! Glyphs come from the Spleen PSF2 fonts and are scaled with nearest
//! neighbour sampling to the requested cell height. Cells are always half as
//! wide as they are tall, matching the monospaced metric of the surface.

use std::collections::HashMap;

use spleen_font::{PSF2Font, FONT_12X24, FONT_6X12};

use crate::error::{LabelError, Result};

/// Cell heights at or above this use the 12x24 face, smaller ones the 6x12 face.
const LARGE_FACE_MIN_HEIGHT: u32 = 18;

/// A monochrome glyph bitmap.
#[derive(Clone, Debug)]
pub(crate) struct Glyph {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Glyph {
    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    /// Returns whether the pixel at `x`, `y` is inked.
    pub(crate) fn is_set(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[(y * self.width + x) as usize]
    }
}

/// Scaled glyphs keyed by character and cell height.
#[derive(Debug, Default)]
pub(crate) struct GlyphCache {
    glyphs: HashMap<(char, u32), Glyph>,
}

impl GlyphCache {
    /// Returns the glyph for `ch` scaled to a cell `height` pixels tall.
    pub(crate) fn glyph(&mut self, ch: char, height: u32) -> Result<&Glyph> {
        let height = height.max(2);
        if !self.glyphs.contains_key(&(ch, height)) {
            let glyph = build_glyph(ch, height)?;
            self.glyphs.insert((ch, height), glyph);
        }
        self.glyphs
            .get(&(ch, height))
            .ok_or_else(|| LabelError::Render(format!("glyph cache lost {ch:?}")))
    }
}

fn build_glyph(ch: char, height: u32) -> Result<Glyph> {
    let (data, src_w, src_h) = if height >= LARGE_FACE_MIN_HEIGHT {
        (FONT_12X24, 12usize, 24usize)
    } else {
        (FONT_6X12, 6usize, 12usize)
    };

    let mut font = PSF2Font::new(data)
        .map_err(|_| LabelError::Render("bundled bitmap font is corrupt".to_owned()))?;

    let mut source = vec![false; src_w * src_h];
    let utf8 = ch.to_string();
    match font.glyph_for_utf8(utf8.as_bytes()) {
        Some(rows) => {
            for (row_y, row) in rows.enumerate() {
                for (col_x, on) in row.enumerate() {
                    if row_y < src_h && col_x < src_w {
                        source[row_y * src_w + col_x] = on;
                    }
                }
            }
        }
        None if ch.is_whitespace() => {}
        None => draw_box(&mut source, src_w, src_h),
    }

    let width = (height / 2).max(1);
    let mut bits = vec![false; (width * height) as usize];
    for dy in 0..height as usize {
        for dx in 0..width as usize {
            let sx = dx * src_w / width as usize;
            let sy = dy * src_h / height as usize;
            bits[dy * width as usize + dx] = source[sy * src_w + sx];
        }
    }

    Ok(Glyph {
        width,
        height,
        bits,
    })
}

/// Outline box used for characters the font does not cover.
fn draw_box(bits: &mut [bool], width: usize, height: usize) {
    for x in 1..width - 1 {
        bits[2 * width + x] = true;
        bits[(height - 2) * width + x] = true;
    }
    for y in 2..height - 1 {
        bits[y * width + 1] = true;
        bits[y * width + width - 2] = true;
    }
}
