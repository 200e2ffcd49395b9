//! Styled text fragments placed on a label surface.
//!
//! A [`Span`] carries the small set of text decorations the label template
//! uses (bold weight and ink color). Both back ends consume the same spans:
//! the rasterizer maps them onto bitmap glyphs, while the vector print path
//! converts them into [`genpdf`] styled strings through
//! [`Span::to_styled_string`].

use genpdf::style::{Color, Style, StyledString};

/// Default ink for label text.
pub const INK: Color = Color::Rgb(0, 0, 0);

/// A slice of text together with inline style attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    text: String,
    bold: bool,
    color: Option<Color>,
}

impl Span {
    /// Creates a new span with the provided text and no styles applied.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Returns the raw text contained in this span.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of characters, which is also the span's advance in em halves.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns whether the span should be rendered in bold.
    pub fn is_bold(&self) -> bool {
        self.bold
    }

    /// Returns the configured color for the span, if any.
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Color the span is drawn with, falling back to [`INK`].
    pub fn ink(&self) -> Color {
        self.color.unwrap_or(INK)
    }

    /// Convenience shorthand that marks the span as bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Convenience shorthand that assigns a color to the span.
    pub fn colored(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    fn to_style(&self) -> Style {
        let mut style = Style::new();
        if let Some(color) = self.color {
            style.set_color(color);
        }
        if self.bold {
            style.set_bold();
        }
        style
    }

    /// Converts the span to a [`StyledString`] for the vector print path.
    pub fn to_styled_string(&self) -> StyledString {
        StyledString::new(self.text.clone(), self.to_style())
    }
}

/// Shortens `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let mut shortened: String = text.chars().take(max_chars - 3).collect();
    shortened.truncate(shortened.trim_end().len());
    shortened.push_str("...");
    shortened
}

/// Greedily wraps `text` on whitespace into lines of at most `max_chars`
/// characters. Words longer than a line are split. At most `max_lines` lines
/// are returned; any remainder is folded into the last line with an ellipsis.
pub fn wrap(text: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_owned();
        loop {
            let current_len = current.chars().count();
            let word_len = word.chars().count();
            let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };

            if needed <= max_chars {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&word);
                break;
            }

            if current.is_empty() {
                let head: String = word.chars().take(max_chars).collect();
                word = word.chars().skip(max_chars).collect();
                lines.push(head);
            } else {
                lines.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines && max_lines > 0 {
        let rest = lines.split_off(max_lines - 1).join(" ");
        lines.push(ellipsize(&rest, max_chars));
    }
    lines
}
