//! The populated label template prior to rasterization.
//!
//! A [`Surface`] is a flat display list in millimetres with the origin at the
//! top-left corner of the label. It is deliberately renderer-agnostic: the
//! bitmap rasterizer and the vector print element both walk the same list.
//!
//! Text uses a monospaced metric: every character advances by half of the
//! font size. The template relies on this to fit text into its regions, so
//! back ends are expected to honour it.

use genpdf::style::Color;

use crate::richtext::Span;

/// Width of a shipping label in millimetres.
pub const LABEL_WIDTH_MM: f64 = 100.0;

/// Height of a shipping label in millimetres.
pub const LABEL_HEIGHT_MM: f64 = 150.0;

/// Ratio between a character's advance and its font size.
pub const CHAR_ADVANCE_RATIO: f64 = 0.5;

/// Axis-aligned rectangle in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Horizontal placement of a text line within its box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Stroke pattern used for frames and rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// A single line of styled text laid into a box.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLine {
    /// Line box; text is vertically centered in it.
    pub bounds: Rect,
    /// Font size (em height) in millimetres.
    pub size_mm: f64,
    pub alignment: HorizontalAlignment,
    pub spans: Vec<Span>,
}

impl TextLine {
    /// Width the line's text occupies under the monospaced metric.
    pub fn text_width(&self) -> f64 {
        let chars: usize = self.spans.iter().map(Span::char_count).sum();
        chars as f64 * self.size_mm * CHAR_ADVANCE_RATIO
    }

    /// Horizontal offset of the first character relative to `bounds.x`.
    pub fn x_offset(&self) -> f64 {
        let free = (self.bounds.width - self.text_width()).max(0.0);
        match self.alignment {
            HorizontalAlignment::Left => 0.0,
            HorizontalAlignment::Center => free / 2.0,
            HorizontalAlignment::Right => free,
        }
    }

    /// Concatenated text of all spans.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(Span::text).collect()
    }
}

/// Drawing primitives that make up a surface.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    /// Rectangle outline with an optional fill.
    Frame {
        bounds: Rect,
        stroke_mm: f64,
        style: StrokeStyle,
        fill: Option<Color>,
        color: Color,
    },
    /// Horizontal rule starting at `x`, `y`.
    Rule {
        x: f64,
        y: f64,
        length: f64,
        stroke_mm: f64,
        style: StrokeStyle,
        color: Color,
    },
    /// One line of text.
    Text(TextLine),
}

/// Populated label template sized to the physical label.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    width_mm: f64,
    height_mm: f64,
    dpi: f64,
    title: String,
    primitives: Vec<Primitive>,
}

impl Surface {
    /// Creates an empty surface of the standard label size.
    pub fn label(dpi: f64, title: impl Into<String>) -> Self {
        Self {
            width_mm: LABEL_WIDTH_MM,
            height_mm: LABEL_HEIGHT_MM,
            dpi,
            title: title.into(),
            primitives: Vec::new(),
        }
    }

    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }

    pub fn height_mm(&self) -> f64 {
        self.height_mm
    }

    /// Resolution the layout was declared at.
    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    /// Document title, typically the order number.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Pixel dimensions of the surface at its declared DPI times `scale`.
    pub fn pixel_size(&self, scale: u32) -> (u32, u32) {
        let px_per_mm = self.dpi / crate::MM_PER_INCH * f64::from(scale);
        (
            (self.width_mm * px_per_mm).round() as u32,
            (self.height_mm * px_per_mm).round() as u32,
        )
    }

    /// Iterates over all text lines in drawing order.
    pub fn text_lines(&self) -> impl Iterator<Item = &TextLine> {
        self.primitives.iter().filter_map(|primitive| match primitive {
            Primitive::Text(line) => Some(line),
            _ => None,
        })
    }

    /// Returns whether any text line contains `needle`.
    pub fn contains_text(&self, needle: &str) -> bool {
        self.text_lines().any(|line| line.plain_text().contains(needle))
    }

    pub(crate) fn push(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }
}
