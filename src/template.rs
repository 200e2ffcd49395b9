//! Fixed 100mm x 150mm shipping label template.
//!
//! Regions, top to bottom: operator header, order-info rows, "Ship To" box,
//! "Ship From" box, contents list, barcode placeholder and footer. Every
//! region has a fixed height; the layout never grows with the data.
//!
//! Overflow policy: long single-line values are ellipsized, the street is
//! wrapped onto at most [`MAX_STREET_LINES`] lines, and the contents list
//! holds at most [`MAX_ITEM_LINES`] lines. When an order has more items the
//! last line is replaced by a `+N more items` marker.
//!
//! The barcode block is a visual placeholder (a bar glyph pattern plus the
//! order number). It is not a scannable symbology.

use genpdf::style::Color;

use crate::config::LabelConfig;
use crate::label::{format_date, LabelItem, LabelRecord};
use crate::richtext::{ellipsize, wrap, Span};
use crate::surface::{
    HorizontalAlignment, Primitive, Rect, StrokeStyle, Surface, TextLine, CHAR_ADVANCE_RATIO,
    LABEL_HEIGHT_MM, LABEL_WIDTH_MM,
};

/// Maximum number of lines in the contents list, marker line included.
pub const MAX_ITEM_LINES: usize = 6;

/// Maximum number of lines the ship-to street may wrap onto.
pub const MAX_STREET_LINES: usize = 2;

/// Glyph pattern drawn in the barcode placeholder.
pub const BARCODE_PLACEHOLDER: &str = "||||| |||| ||||| |||| |||||";

const PADDING: f64 = 6.0;
const CONTENT_X: f64 = PADDING;
const CONTENT_WIDTH: f64 = LABEL_WIDTH_MM - 2.0 * PADDING;
const BOX_INSET: f64 = 1.5;

const TITLE_SIZE: f64 = 4.2;
const DETAIL_SIZE: f64 = 2.6;
const BODY_SIZE: f64 = 3.0;
const SECTION_SIZE: f64 = 2.8;
const ITEM_SIZE: f64 = 2.6;
const CODE_SIZE: f64 = 3.6;

const DETAIL_LINE: f64 = 3.4;
const INFO_LINE: f64 = 4.0;
const BODY_LINE: f64 = 3.6;
const SECTION_BAR: f64 = 4.4;
const ITEM_LINE: f64 = 3.4;

const HEADER_TOP: f64 = 6.0;
const HEADER_RULE_Y: f64 = 22.2;
const INFO_TOP: f64 = 24.0;
const SHIP_TO: Rect = Rect::new(CONTENT_X, 37.0, CONTENT_WIDTH, 28.0);
const SHIP_FROM: Rect = Rect::new(CONTENT_X, 67.0, CONTENT_WIDTH, 21.0);
const CONTENTS: Rect = Rect::new(CONTENT_X, 90.0, CONTENT_WIDTH, 28.0);
const BARCODE: Rect = Rect::new(CONTENT_X, 120.0, CONTENT_WIDTH, 11.0);
const FOOTER_RULE_Y: f64 = 133.0;

const MUTED: Color = Color::Greyscale(102);
const SECTION_FILL: Color = Color::Greyscale(240);
const BARCODE_FILL: Color = Color::Greyscale(249);
const SEPARATOR: Color = Color::Greyscale(204);
const BLACK: Color = Color::Rgb(0, 0, 0);

/// Renders a label record into a populated surface.
///
/// The result depends only on `record` and `config`, so rendering the same
/// record twice yields identical surfaces.
pub fn render_label(record: &LabelRecord, config: &LabelConfig) -> Surface {
    let mut canvas = TemplateCanvas::new(Surface::label(
        config.template_dpi(),
        format!("Shipping Label - {}", record.order_number()),
    ));

    canvas.frame(
        Rect::new(1.0, 1.0, LABEL_WIDTH_MM - 2.0, LABEL_HEIGHT_MM - 2.0),
        0.5,
        StrokeStyle::Solid,
        None,
    );

    header(&mut canvas, config);
    order_info(&mut canvas, record);
    ship_to(&mut canvas, record);
    ship_from(&mut canvas, record);
    contents(&mut canvas, record.line_items());
    barcode(&mut canvas, record);
    footer(&mut canvas, record, config);

    canvas.finish()
}

/// Lines the contents region shows for `items`, applying the overflow marker.
pub fn item_lines(items: &[LabelItem]) -> Vec<Vec<Span>> {
    let max_chars = chars_fitting(CONTENT_WIDTH - 2.0 * BOX_INSET, ITEM_SIZE);
    let visible = if items.len() > MAX_ITEM_LINES {
        MAX_ITEM_LINES - 1
    } else {
        items.len()
    };

    let mut lines: Vec<Vec<Span>> = items[..visible]
        .iter()
        .map(|item| {
            let mut suffix = format!(" (Qty: {})", item.quantity);
            if let Some(code) = &item.code {
                suffix.push_str(&format!(" - SKU: {code}"));
            }
            let name_budget = max_chars.saturating_sub(suffix.chars().count());
            vec![Span::new(ellipsize(&item.name, name_budget)).bold(), Span::new(suffix)]
        })
        .collect();

    if visible < items.len() {
        lines.push(vec![Span::new(format!("+{} more items", items.len() - visible)).bold()]);
    }
    lines
}

fn header(canvas: &mut TemplateCanvas, config: &LabelConfig) {
    let operator = config.operator();
    let full = Rect::new(CONTENT_X, HEADER_TOP, CONTENT_WIDTH, 5.0);
    let name = Span::new(&operator.name).bold();
    canvas.line_fit(full, TITLE_SIZE, HorizontalAlignment::Center, name);

    let details = [
        operator.address.clone(),
        operator.city.clone(),
        format!("{} | {}", operator.phone, operator.email),
    ];
    for (index, detail) in details.iter().enumerate() {
        let bounds = Rect::new(
            CONTENT_X,
            full.bottom() + index as f64 * DETAIL_LINE,
            CONTENT_WIDTH,
            DETAIL_LINE,
        );
        canvas.line_fit(
            bounds,
            DETAIL_SIZE,
            HorizontalAlignment::Center,
            Span::new(detail).colored(MUTED),
        );
    }

    canvas.rule(HEADER_RULE_Y, CONTENT_X, CONTENT_WIDTH, 0.5, StrokeStyle::Solid, BLACK);
}

fn order_info(canvas: &mut TemplateCanvas, record: &LabelRecord) {
    let half = CONTENT_WIDTH / 2.0;
    let row = |index: usize, x: f64| {
        Rect::new(x, INFO_TOP + index as f64 * INFO_LINE, half, INFO_LINE)
    };

    let order = Span::new(format!("Order: {}", record.order_number())).bold();
    canvas.line_fit(row(0, CONTENT_X), BODY_SIZE, HorizontalAlignment::Left, order);
    canvas.text(
        row(1, CONTENT_X),
        BODY_SIZE,
        HorizontalAlignment::Left,
        vec![Span::new("Date: ").bold(), Span::new(format_date(record.order_date()))],
    );
    canvas.text(
        row(0, CONTENT_X + half),
        BODY_SIZE,
        HorizontalAlignment::Right,
        vec![Span::new("Label Date: ").bold(), Span::new(format_date(record.label_date()))],
    );
    canvas.text(
        row(1, CONTENT_X + half),
        BODY_SIZE,
        HorizontalAlignment::Right,
        vec![Span::new("Items: ").bold(), Span::new(record.item_count().to_string())],
    );

    let budget = chars_fitting(half, BODY_SIZE).saturating_sub(8);
    if let Some(weight) = record.weight() {
        canvas.text(
            row(2, CONTENT_X),
            BODY_SIZE,
            HorizontalAlignment::Left,
            vec![Span::new("Weight: ").bold(), Span::new(ellipsize(weight, budget))],
        );
    }
    if let Some(dimensions) = record.dimensions() {
        canvas.text(
            row(2, CONTENT_X + half),
            BODY_SIZE,
            HorizontalAlignment::Right,
            vec![Span::new("Dims: ").bold(), Span::new(ellipsize(dimensions, budget))],
        );
    }
}

fn ship_to(canvas: &mut TemplateCanvas, record: &LabelRecord) {
    let block = record.ship_to();
    let width = SHIP_TO.width - 2.0 * BOX_INSET;
    let max_chars = chars_fitting(width, BODY_SIZE);

    let mut lines = vec![Span::new(ellipsize(&block.name, max_chars)).bold()];
    let mut address = block.lines.iter();
    if let Some(street) = address.next() {
        lines.extend(wrap(street, max_chars, MAX_STREET_LINES).into_iter().map(Span::new));
    }
    lines.extend(address.map(|line| Span::new(ellipsize(line, max_chars))));
    if let Some(phone) = record.customer_phone() {
        lines.push(Span::new(ellipsize(&format!("Phone: {phone}"), max_chars)));
    }

    section(canvas, SHIP_TO, "Ship To:", lines);
}

fn ship_from(canvas: &mut TemplateCanvas, record: &LabelRecord) {
    let block = record.ship_from();
    let max_chars = chars_fitting(SHIP_FROM.width - 2.0 * BOX_INSET, BODY_SIZE);

    let mut lines = vec![Span::new(ellipsize(&block.name, max_chars)).bold()];
    lines.extend(block.lines.iter().map(|line| Span::new(ellipsize(line, max_chars))));

    section(canvas, SHIP_FROM, "Ship From:", lines);
}

fn section(canvas: &mut TemplateCanvas, bounds: Rect, title: &str, lines: Vec<Span>) {
    section_frame(canvas, bounds, title);
    for (index, span) in lines.into_iter().enumerate() {
        let line = Rect::new(
            bounds.x + BOX_INSET,
            bounds.y + SECTION_BAR + 0.8 + index as f64 * BODY_LINE,
            bounds.width - 2.0 * BOX_INSET,
            BODY_LINE,
        );
        canvas.text(line, BODY_SIZE, HorizontalAlignment::Left, vec![span]);
    }
}

fn section_frame(canvas: &mut TemplateCanvas, bounds: Rect, title: &str) {
    canvas.frame(bounds, 0.25, StrokeStyle::Solid, None);
    let bar = Rect::new(bounds.x + 0.5, bounds.y + 0.5, bounds.width - 1.0, SECTION_BAR - 0.5);
    canvas.frame(bar, 0.0, StrokeStyle::Solid, Some(SECTION_FILL));
    canvas.text(
        Rect::new(bar.x + 1.0, bar.y, bar.width - 2.0, bar.height),
        SECTION_SIZE,
        HorizontalAlignment::Left,
        vec![Span::new(title.to_uppercase()).bold()],
    );
}

fn contents(canvas: &mut TemplateCanvas, items: &[LabelItem]) {
    section_frame(canvas, CONTENTS, "Contents:");

    for (index, spans) in item_lines(items).into_iter().enumerate() {
        let line = Rect::new(
            CONTENTS.x + BOX_INSET,
            CONTENTS.y + SECTION_BAR + 0.8 + index as f64 * ITEM_LINE,
            CONTENTS.width - 2.0 * BOX_INSET,
            ITEM_LINE,
        );
        canvas.text(line, ITEM_SIZE, HorizontalAlignment::Left, spans);
        canvas.rule(line.bottom(), line.x, line.width, 0.15, StrokeStyle::Dotted, SEPARATOR);
    }
}

fn barcode(canvas: &mut TemplateCanvas, record: &LabelRecord) {
    canvas.frame(BARCODE, 0.3, StrokeStyle::Dashed, Some(BARCODE_FILL));
    let bars = Rect::new(BARCODE.x, BARCODE.y + 1.0, BARCODE.width, 5.0);
    canvas.text(
        bars,
        CODE_SIZE,
        HorizontalAlignment::Center,
        vec![Span::new(BARCODE_PLACEHOLDER)],
    );
    canvas.line_fit(
        Rect::new(BARCODE.x, bars.bottom(), BARCODE.width, 4.5),
        CODE_SIZE,
        HorizontalAlignment::Center,
        Span::new(record.order_number()),
    );
}

fn footer(canvas: &mut TemplateCanvas, record: &LabelRecord, config: &LabelConfig) {
    canvas.rule(FOOTER_RULE_Y, CONTENT_X, CONTENT_WIDTH, 0.3, StrokeStyle::Solid, BLACK);

    let notice = Rect::new(CONTENT_X, FOOTER_RULE_Y + 1.0, CONTENT_WIDTH, DETAIL_LINE);
    canvas.line_fit(
        notice,
        DETAIL_SIZE,
        HorizontalAlignment::Center,
        Span::new(config.handling_notice()).bold(),
    );

    let value = format!(
        "Value: {} {} | Insured Package",
        config.currency_prefix(),
        record.formatted_total()
    );
    canvas.line_fit(
        Rect::new(CONTENT_X, notice.bottom(), CONTENT_WIDTH, DETAIL_LINE),
        DETAIL_SIZE,
        HorizontalAlignment::Center,
        Span::new(value),
    );
}

fn chars_fitting(width: f64, size_mm: f64) -> usize {
    (width / (size_mm * CHAR_ADVANCE_RATIO)).floor() as usize
}

/// Thin wrapper that appends primitives to a surface under construction.
struct TemplateCanvas {
    surface: Surface,
}

impl TemplateCanvas {
    fn new(surface: Surface) -> Self {
        Self { surface }
    }

    fn finish(self) -> Surface {
        self.surface
    }

    fn text(
        &mut self,
        bounds: Rect,
        size_mm: f64,
        alignment: HorizontalAlignment,
        spans: Vec<Span>,
    ) {
        self.surface.push(Primitive::Text(TextLine {
            bounds,
            size_mm,
            alignment,
            spans,
        }));
    }

    /// Adds a single-span line, ellipsizing it to the box width.
    fn line_fit(&mut self, bounds: Rect, size_mm: f64, alignment: HorizontalAlignment, span: Span) {
        let max_chars = chars_fitting(bounds.width, size_mm);
        let mut fitted = Span::new(ellipsize(span.text(), max_chars));
        if span.is_bold() {
            fitted = fitted.bold();
        }
        if let Some(color) = span.color() {
            fitted = fitted.colored(color);
        }
        self.text(bounds, size_mm, alignment, vec![fitted]);
    }

    fn frame(&mut self, bounds: Rect, stroke_mm: f64, style: StrokeStyle, fill: Option<Color>) {
        self.surface.push(Primitive::Frame {
            bounds,
            stroke_mm,
            style,
            fill,
            color: BLACK,
        });
    }

    fn rule(
        &mut self,
        y: f64,
        x: f64,
        length: f64,
        stroke_mm: f64,
        style: StrokeStyle,
        color: Color,
    ) {
        self.surface.push(Primitive::Rule {
            x,
            y,
            length,
            stroke_mm,
            style,
            color,
        });
    }
}
