//! `genpdf` element that draws a label [`Surface`] as vector graphics.
//!
//! This is the print path: frames, rules and text are emitted as PDF
//! operators instead of a bitmap so the printer rasterizes at its own
//! resolution. Background fills are not representable with `genpdf` line
//! drawing and are left out; text falls back to the loaded font's metrics.

use genpdf::error::Error;
use genpdf::style::{Color, Style};
use genpdf::{render, Element, Mm, Position, RenderResult, Size};

use crate::surface::{Primitive, Rect, StrokeStyle, Surface, TextLine};

const POINTS_PER_MM: f64 = 72.0 / crate::MM_PER_INCH;

/// Spacing between the parallel strokes that approximate thick lines.
const STROKE_STEP_MM: f64 = 0.2;

fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

fn position(x: f64, y: f64) -> Position {
    Position::new(mm_from_f64(x), mm_from_f64(y))
}

/// Renders every primitive of a surface, anchored at the top-left of the
/// area it is given.
pub struct SurfaceElement {
    surface: Surface,
}

impl SurfaceElement {
    pub fn new(surface: Surface) -> Self {
        Self { surface }
    }

    fn draw_segment(
        area: &render::Area<'_>,
        from: (f64, f64),
        to: (f64, f64),
        stroke_mm: f64,
        pattern: StrokeStyle,
        color: Color,
    ) {
        let style = Style::new().with_color(color);
        let horizontal = (to.1 - from.1).abs() < f64::EPSILON;
        let length = if horizontal { to.0 - from.0 } else { to.1 - from.1 };
        let passes = (stroke_mm / STROKE_STEP_MM).round().max(1.0) as usize;

        let (on, off) = match pattern {
            StrokeStyle::Solid => (length, 0.0),
            StrokeStyle::Dashed => (stroke_mm * 4.0, stroke_mm * 3.0),
            StrokeStyle::Dotted => (stroke_mm, stroke_mm),
        };
        let on = on.max(STROKE_STEP_MM);

        for pass in 0..passes {
            let shift = (pass as f64 - (passes - 1) as f64 / 2.0) * STROKE_STEP_MM;
            let mut start = 0.0;
            while start < length {
                let end = (start + on).min(length);
                let (a, b) = if horizontal {
                    let y = from.1 + shift;
                    (position(from.0 + start, y), position(from.0 + end, y))
                } else {
                    let x = from.0 + shift;
                    (position(x, from.1 + start), position(x, from.1 + end))
                };
                area.draw_line(vec![a, b], style);
                start = end + off;
            }
        }
    }

    fn draw_frame(
        area: &render::Area<'_>,
        bounds: Rect,
        stroke_mm: f64,
        pattern: StrokeStyle,
        color: Color,
    ) {
        let (left, top, right, bottom) = (bounds.x, bounds.y, bounds.right(), bounds.bottom());
        Self::draw_segment(area, (left, top), (right, top), stroke_mm, pattern, color);
        Self::draw_segment(area, (left, bottom), (right, bottom), stroke_mm, pattern, color);
        Self::draw_segment(area, (left, top), (left, bottom), stroke_mm, pattern, color);
        Self::draw_segment(area, (right, top), (right, bottom), stroke_mm, pattern, color);
    }

    fn draw_text(
        context: &genpdf::Context,
        area: &render::Area<'_>,
        line: &TextLine,
        style: Style,
    ) -> Result<(), Error> {
        let font_size = (line.size_mm * POINTS_PER_MM).round().clamp(1.0, 255.0) as u8;
        let top = line.bounds.y + (line.bounds.height - line.size_mm).max(0.0) / 2.0;
        let origin = position(line.bounds.x + line.x_offset(), top);
        let base = style.with_font_size(font_size);

        if let Some(mut section) = area.text_section(&context.font_cache, origin, base) {
            for span in &line.spans {
                let styled = span.to_styled_string();
                section.print_str(&styled.s, base.and(styled.style))?;
            }
        }
        Ok(())
    }
}

impl Element for SurfaceElement {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        for primitive in self.surface.primitives() {
            match primitive {
                Primitive::Frame {
                    bounds,
                    stroke_mm,
                    style: pattern,
                    color,
                    ..
                } => Self::draw_frame(&area, *bounds, *stroke_mm, *pattern, *color),
                Primitive::Rule {
                    x,
                    y,
                    length,
                    stroke_mm,
                    style: pattern,
                    color,
                } => {
                    let (from, to) = ((*x, *y), (*x + *length, *y));
                    Self::draw_segment(&area, from, to, *stroke_mm, *pattern, *color)
                }
                Primitive::Text(line) => Self::draw_text(context, &area, line, style)?,
            }
        }

        let mut result = RenderResult::default();
        result.size = Size::new(
            mm_from_f64(self.surface.width_mm()),
            mm_from_f64(self.surface.height_mm()),
        );
        Ok(result)
    }
}
