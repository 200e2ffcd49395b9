//! Surface rasterization.
//!
//! The [`Rasterizer`] trait is the narrow seam between the deterministic
//! parts of the pipeline and pixel production. [`BitmapRasterizer`] is the
//! bundled implementation: it paints a [`Surface`] onto an opaque RGB canvas
//! using Spleen bitmap glyphs, so it needs no font files or display.
//!
//! Every call acquires its own [`RenderContext`] and drops it before
//! returning, on success and on failure alike. Nothing drawn for one label
//! can leak into the next.

mod font;

use std::io::Cursor;

use genpdf::style::Color;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use log::debug;

use crate::config::MIN_RASTER_SCALE;
use crate::error::{LabelError, Result};
use crate::surface::{Primitive, Rect, StrokeStyle, Surface, TextLine, CHAR_ADVANCE_RATIO};
use crate::MM_PER_INCH;

use self::font::GlyphCache;

/// Upper bound on canvas size, guarding against absurd DPI settings.
const MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// A fixed-resolution, fully opaque label image.
#[derive(Clone, Debug)]
pub struct RasterImage {
    pixels: RgbImage,
    dpi: f64,
}

impl RasterImage {
    /// Wraps an RGB buffer rendered at `dpi` pixels per inch.
    pub fn new(pixels: RgbImage, dpi: f64) -> Self {
        Self { pixels, dpi }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Effective resolution of the pixels.
    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Converts the raster into an [`image::DynamicImage`] without alpha.
    pub fn to_dynamic_image(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.pixels.clone())
    }

    /// Encodes the raster as PNG, e.g. for label previews.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.to_dynamic_image()
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .map_err(|err| LabelError::Render(format!("PNG encoding failed: {err}")))?;
        Ok(bytes)
    }
}

/// Produces pixels from a populated surface.
pub trait Rasterizer {
    /// Renders `surface` at its declared DPI multiplied by `scale`.
    ///
    /// Failures are reported as [`LabelError::Render`] and concern only the
    /// surface being rendered.
    fn rasterize(&mut self, surface: &Surface, scale: u32) -> Result<RasterImage>;
}

/// Rasterizer painting surfaces with bundled bitmap glyphs.
#[derive(Debug, Default)]
pub struct BitmapRasterizer {
    glyphs: GlyphCache,
}

impl BitmapRasterizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Rasterizer for BitmapRasterizer {
    fn rasterize(&mut self, surface: &Surface, scale: u32) -> Result<RasterImage> {
        let mut context = RenderContext::acquire(surface, scale)?;
        for primitive in surface.primitives() {
            match primitive {
                Primitive::Frame {
                    bounds,
                    stroke_mm,
                    style,
                    fill,
                    color,
                } => context.frame(*bounds, *stroke_mm, *style, *fill, *color),
                Primitive::Rule {
                    x,
                    y,
                    length,
                    stroke_mm,
                    style,
                    color,
                } => context.rule(*x, *y, *length, *stroke_mm, *style, *color),
                Primitive::Text(line) => context.text(line, &mut self.glyphs)?,
            }
        }
        Ok(context.finish())
    }
}

/// Off-screen canvas owned by a single rasterization call.
struct RenderContext {
    canvas: RgbImage,
    px_per_mm: f64,
    dpi: f64,
    title: String,
}

impl RenderContext {
    fn acquire(surface: &Surface, scale: u32) -> Result<Self> {
        if scale < MIN_RASTER_SCALE {
            return Err(LabelError::Render(format!(
                "raster scale {scale} is below the minimum of {MIN_RASTER_SCALE}"
            )));
        }
        let dpi = surface.dpi() * f64::from(scale);
        if !(dpi.is_finite() && dpi > 0.0 && surface.width_mm() > 0.0 && surface.height_mm() > 0.0)
        {
            return Err(LabelError::Render(format!(
                "surface '{}' has no renderable area",
                surface.title()
            )));
        }

        let (width, height) = surface.pixel_size(scale);
        if width == 0 || height == 0 || u64::from(width) * u64::from(height) > MAX_CANVAS_PIXELS {
            return Err(LabelError::Render(format!(
                "surface '{}' would rasterize to {width}x{height} pixels",
                surface.title()
            )));
        }

        debug!("Acquired {width}x{height} render context for '{}'", surface.title());
        Ok(Self {
            canvas: RgbImage::from_pixel(width, height, BACKGROUND),
            px_per_mm: dpi / MM_PER_INCH,
            dpi,
            title: surface.title().to_owned(),
        })
    }

    fn finish(mut self) -> RasterImage {
        let canvas = std::mem::replace(&mut self.canvas, RgbImage::new(0, 0));
        RasterImage::new(canvas, self.dpi)
    }

    fn px(&self, mm: f64) -> i64 {
        (mm * self.px_per_mm).round() as i64
    }

    fn thickness(&self, stroke_mm: f64) -> i64 {
        self.px(stroke_mm).max(1)
    }

    fn frame(
        &mut self,
        bounds: Rect,
        stroke_mm: f64,
        style: StrokeStyle,
        fill: Option<Color>,
        color: Color,
    ) {
        let (x0, y0) = (self.px(bounds.x), self.px(bounds.y));
        let (x1, y1) = (self.px(bounds.right()), self.px(bounds.bottom()));

        if let Some(fill) = fill {
            self.fill_rect(x0, y0, x1, y1, to_rgb(fill));
        }
        if stroke_mm <= 0.0 {
            return;
        }

        let t = self.thickness(stroke_mm);
        let ink = to_rgb(color);
        self.stroke(x0, y0, x1 - x0, t, true, style, ink);
        self.stroke(x0, y1 - t, x1 - x0, t, true, style, ink);
        self.stroke(x0, y0, y1 - y0, t, false, style, ink);
        self.stroke(x1 - t, y0, y1 - y0, t, false, style, ink);
    }

    fn rule(
        &mut self,
        x: f64,
        y: f64,
        length: f64,
        stroke_mm: f64,
        style: StrokeStyle,
        color: Color,
    ) {
        let t = self.thickness(stroke_mm);
        let (x0, y0) = (self.px(x), self.px(y) - t / 2);
        let len = self.px(x + length) - x0;
        self.stroke(x0, y0, len, t, true, style, to_rgb(color));
    }

    /// Draws a horizontal or vertical band of thickness `t`, broken into
    /// dashes or dots according to `style`.
    #[allow(clippy::too_many_arguments)]
    fn stroke(
        &mut self,
        x: i64,
        y: i64,
        length: i64,
        t: i64,
        horizontal: bool,
        style: StrokeStyle,
        ink: Rgb<u8>,
    ) {
        let (on, off) = match style {
            StrokeStyle::Solid => (length.max(1), 0),
            StrokeStyle::Dashed => (4 * t, 3 * t),
            StrokeStyle::Dotted => (t, t),
        };

        let mut start = 0;
        while start < length {
            let end = (start + on).min(length);
            if horizontal {
                self.fill_rect(x + start, y, x + end, y + t, ink);
            } else {
                self.fill_rect(x, y + start, x + t, y + end, ink);
            }
            start = end + off;
        }
    }

    fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, ink: Rgb<u8>) {
        let (w, h) = (i64::from(self.canvas.width()), i64::from(self.canvas.height()));
        for y in y0.max(0)..y1.min(h) {
            for x in x0.max(0)..x1.min(w) {
                self.canvas.put_pixel(x as u32, y as u32, ink);
            }
        }
    }

    fn text(&mut self, line: &TextLine, glyphs: &mut GlyphCache) -> Result<()> {
        let cell_height = self.px(line.size_mm).max(2) as u32;
        let advance = line.size_mm * CHAR_ADVANCE_RATIO * self.px_per_mm;
        let origin_x = (line.bounds.x + line.x_offset()) * self.px_per_mm;
        let top =
            self.px(line.bounds.y) + (self.px(line.bounds.height) - i64::from(cell_height)) / 2;
        let embolden = i64::from(cell_height / 16).max(1);

        let mut column = 0usize;
        for span in &line.spans {
            let ink = to_rgb(span.ink());
            for ch in span.text().chars() {
                let left = (origin_x + column as f64 * advance).round() as i64;
                column += 1;
                let glyph = glyphs.glyph(ch, cell_height)?;
                for gy in 0..glyph.height() {
                    for gx in 0..glyph.width() {
                        if !glyph.is_set(gx, gy) {
                            continue;
                        }
                        let (px, py) = (left + i64::from(gx), top + i64::from(gy));
                        self.plot(px, py, ink);
                        if span.is_bold() {
                            for dx in 1..=embolden {
                                self.plot(px + dx, py, ink);
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn plot(&mut self, x: i64, y: i64, ink: Rgb<u8>) {
        let (width, height) = self.canvas.dimensions();
        if x >= 0 && y >= 0 && x < i64::from(width) && y < i64::from(height) {
            self.canvas.put_pixel(x as u32, y as u32, ink);
        }
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        debug!("Released render context for '{}'", self.title);
    }
}

fn to_rgb(color: Color) -> Rgb<u8> {
    match color {
        Color::Rgb(r, g, b) => Rgb([r, g, b]),
        Color::Greyscale(v) => Rgb([v, v, v]),
        Color::Cmyk(c, m, y, k) => {
            let channel = |value: u8| {
                let (value, k) = (f64::from(value) / 255.0, f64::from(k) / 255.0);
                let ink = value + k * (1.0 - value);
                (255.0 * (1.0 - ink.min(1.0))).round() as u8
            };
            Rgb([channel(c), channel(m), channel(y)])
        }
    }
}
