use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};

use shipping_labels::document::assemble_batch;
use shipping_labels::{
    fonts, map_order_to_label, render_label, BatchOptions, BitmapRasterizer, DirectorySink,
    LabelConfig, LabelError, LabelService, Order, OrderItem, PrintSink, PrintSurface, RasterImage,
    Rasterizer, Result, ShippingAddress, Surface,
};

const PT_PER_MM: f64 = 72.0 / 25.4;

fn label_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 16).expect("valid date")
}

fn service() -> LabelService {
    LabelService::new(LabelConfig::new()).with_label_date(label_date())
}

fn order(id: &str, items: &[(&str, u32)]) -> Order {
    let created_at = Utc.with_ymd_and_hms(2025, 1, 15, 5, 0, 0).unwrap();
    let mut order = Order::new(id, "Asha Rao", 4500.0, created_at)
        .with_contact("asha@example.com", None)
        .with_address(ShippingAddress::new("7 Lake View", "Pune", "Maharashtra", "411001"));
    for (name, quantity) in items {
        order = order.with_item(OrderItem::new(*name, *quantity).with_product_id("prod_abc123"));
    }
    order
}

fn number(object: &Object) -> f64 {
    match object {
        Object::Integer(value) => *value as f64,
        Object::Real(value) => *value as f64,
        other => panic!("expected a number, found {other:?}"),
    }
}

fn media_box(document: &Document, page: ObjectId) -> (f64, f64) {
    let mut dictionary = document
        .get_object(page)
        .and_then(Object::as_dict)
        .expect("page dictionary");
    loop {
        if let Ok(entry) = dictionary.get(b"MediaBox") {
            let entries = entry.as_array().expect("MediaBox array");
            let values: Vec<f64> = entries.iter().map(number).collect();
            return (values[2] - values[0], values[3] - values[1]);
        }
        let parent = dictionary
            .get(b"Parent")
            .and_then(Object::as_reference)
            .expect("MediaBox is inherited from a parent");
        dictionary = document
            .get_object(parent)
            .and_then(Object::as_dict)
            .expect("parent dictionary");
    }
}

fn page_sizes_mm(bytes: &[u8]) -> Vec<(f64, f64)> {
    let document = Document::load_mem(bytes).expect("output is a readable PDF");
    document
        .get_pages()
        .values()
        .map(|page| {
            let (width, height) = media_box(&document, *page);
            (width / PT_PER_MM, height / PT_PER_MM)
        })
        .collect()
}

/// Where each page draws its image, as `(x, y, width, height)` in mm from
/// the bottom-left corner, composed from the `cm` operators in front of `Do`.
fn image_placements_mm(bytes: &[u8]) -> Vec<(f64, f64, f64, f64)> {
    fn concat(m: [f64; 6], ctm: [f64; 6]) -> [f64; 6] {
        [
            m[0] * ctm[0] + m[1] * ctm[2],
            m[0] * ctm[1] + m[1] * ctm[3],
            m[2] * ctm[0] + m[3] * ctm[2],
            m[2] * ctm[1] + m[3] * ctm[3],
            m[4] * ctm[0] + m[5] * ctm[2] + ctm[4],
            m[4] * ctm[1] + m[5] * ctm[3] + ctm[5],
        ]
    }

    let document = Document::load_mem(bytes).expect("output is a readable PDF");
    let mut placements = Vec::new();
    for page in document.get_pages().values() {
        let data = document.get_page_content(*page).expect("page content");
        let content: Content = Content::decode(&data).expect("content stream decodes");

        let mut ctm = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let mut saved = Vec::new();
        for operation in &content.operations {
            match operation.operator.as_str() {
                "q" => saved.push(ctm),
                "Q" => ctm = saved.pop().expect("balanced q/Q"),
                "cm" => {
                    let values: Vec<f64> = operation.operands.iter().map(number).collect();
                    let m = [values[0], values[1], values[2], values[3], values[4], values[5]];
                    ctm = concat(m, ctm);
                }
                "Do" => placements.push((
                    ctm[4] / PT_PER_MM,
                    ctm[5] / PT_PER_MM,
                    ctm[0] / PT_PER_MM,
                    ctm[3] / PT_PER_MM,
                )),
                _ => {}
            }
        }
    }
    placements
}

fn assert_placement(actual: (f64, f64, f64, f64), expected: (f64, f64, f64, f64)) {
    let close = |a: f64, b: f64| (a - b).abs() < 0.2;
    assert!(
        close(actual.0, expected.0)
            && close(actual.1, expected.1)
            && close(actual.2, expected.2)
            && close(actual.3, expected.3),
        "label drawn at {actual:?} mm, expected {expected:?} mm"
    );
}

fn assert_page_size(actual: (f64, f64), expected: (f64, f64)) {
    assert!(
        (actual.0 - expected.0).abs() < 0.2 && (actual.1 - expected.1).abs() < 0.2,
        "page is {actual:?} mm, expected {expected:?} mm"
    );
}

#[test]
fn demo_order_becomes_single_label_page() {
    let demo = Order::demo();
    let download = service().generate_single_label(&demo).expect("demo label renders");

    assert_eq!(download.order_number, "GS12345678");
    assert_eq!(download.filename, "shipping-label-GS12345678.pdf");

    let pages = page_sizes_mm(&download.bytes);
    assert_eq!(pages.len(), 1);
    assert_page_size(pages[0], (100.0, 150.0));

    let placements = image_placements_mm(&download.bytes);
    assert_eq!(placements.len(), 1);
    assert_placement(placements[0], (0.0, 0.0, 100.0, 150.0));

    let record = map_order_to_label(&demo, &LabelConfig::new()).unwrap();
    let surface = render_label(&record, &LabelConfig::new());
    assert!(surface.contains_text("Elegant Ruby Heart Pendant"));
    assert!(surface.contains_text("Gold Plated Chain (18 inch)"));
    assert!(surface.contains_text("INR 19,998"));
}

#[test]
fn single_label_page_size_ignores_content_volume() {
    let names: Vec<String> = (0..20)
        .map(|i| format!("Handcrafted Silver Anklet Set {i}"))
        .collect();
    let items: Vec<(&str, u32)> = names.iter().map(|name| (name.as_str(), 3)).collect();
    let mut busy = order("ord_many_items", &items);
    busy.shipping_address = Some(ShippingAddress::new(
        "Flat 402, Tower B, Prestige Shantiniketan, Whitefield Main Road, Near ITPL Gate 2",
        "Bengaluru",
        "Karnataka",
        "560048",
    ));

    let download = service().generate_single_label(&busy).unwrap();
    let pages = page_sizes_mm(&download.bytes);
    assert_eq!(pages.len(), 1);
    assert_page_size(pages[0], (100.0, 150.0));
}

#[test]
fn batch_skips_order_without_items() {
    let orders = vec![
        order("ord_first_0001", &[("Ring", 1)]),
        order("ord_empty_0002", &[]),
        order("ord_third_0003", &[("Bangle", 2)]),
    ];

    let batch = service()
        .generate_batch_labels(&orders, &BatchOptions::new())
        .expect("partial batch still produces a document");

    assert_eq!(batch.succeeded(), 2);
    assert_eq!(batch.failed(), 1);
    assert_eq!(batch.failures[0].order_id, "ord_empty_0002");
    assert!(matches!(batch.failures[0].reason, LabelError::InvalidOrder { .. }));

    let pages = page_sizes_mm(&batch.bytes);
    assert_eq!(pages.len(), 2);
    for page in pages {
        assert_page_size(page, (210.0, 297.0));
    }
    assert!(batch.filename.starts_with("shipping-labels-batch-"));
    assert!(batch.filename.ends_with(".pdf"));
}

#[test]
fn batch_pages_follow_input_order() {
    let orders: Vec<Order> = (1..=4)
        .map(|i| order(&format!("order_0000000{i}"), &[("Earrings", i)]))
        .collect();

    let outcome = assemble_batch(
        &orders,
        &LabelConfig::new(),
        &mut BitmapRasterizer::new(),
        &BatchOptions::new().with_label_date(label_date()),
    )
    .unwrap();

    assert!(outcome.failures.is_empty());
    assert_eq!(
        outcome.document.page_titles(),
        &["GS00000001", "GS00000002", "GS00000003", "GS00000004"]
    );
    for geometry in outcome.document.pages() {
        assert_eq!((geometry.label.x, geometry.label.y), (55.0, 73.5));
        assert_eq!((geometry.label.width, geometry.label.height), (100.0, 150.0));
    }
    assert_eq!(page_sizes_mm(outcome.document.bytes()).len(), 4);

    let placements = image_placements_mm(outcome.document.bytes());
    assert_eq!(placements.len(), 4);
    for placement in placements {
        assert_placement(placement, (55.0, 73.5, 100.0, 150.0));
    }
}

#[test]
fn empty_batch_is_rejected() {
    let err = service().generate_batch_labels(&[], &BatchOptions::new()).unwrap_err();
    assert!(matches!(err, LabelError::EmptyBatch));
}

#[test]
fn batch_without_any_success_reports_every_failure() {
    let orders = vec![order("ord_a", &[]), order("ord_b", &[])];
    let err = service().generate_batch_labels(&orders, &BatchOptions::new()).unwrap_err();

    match err {
        LabelError::NothingRendered { failures } => {
            let ids: Vec<&str> = failures.iter().map(|f| f.order_id.as_str()).collect();
            assert_eq!(ids, vec!["ord_a", "ord_b"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn single_label_propagates_invalid_order() {
    let err = service().generate_single_label(&order("ord_empty", &[])).unwrap_err();
    assert!(matches!(
        err,
        LabelError::InvalidOrder { ref order_id, .. } if order_id == "ord_empty"
    ));
}

#[test]
fn rasterization_is_deterministic() {
    let demo = Order::demo();
    let mut service = service();
    let first = service.preview_label(&demo).unwrap();
    let second = service.preview_label(&demo).unwrap();

    assert_eq!((first.width(), first.height()), (756, 1134));
    let digest =
        |image: &RasterImage| -> [u8; 32] { Sha256::digest(image.pixels().as_raw()).into() };
    assert_eq!(digest(&first), digest(&second));
    assert!(first.to_png().unwrap().starts_with(b"\x89PNG"));
}

/// Delegates to the bitmap rasterizer but fails for surfaces showing `poison`.
struct SelectiveRasterizer {
    inner: BitmapRasterizer,
    poison: &'static str,
}

impl Rasterizer for SelectiveRasterizer {
    fn rasterize(&mut self, surface: &Surface, scale: u32) -> Result<RasterImage> {
        if surface.contains_text(self.poison) {
            return Err(LabelError::Render("render context detached".to_owned()));
        }
        self.inner.rasterize(surface, scale)
    }
}

#[test]
fn render_failure_is_isolated_to_its_order() {
    let orders = vec![
        order("ord_good_0001", &[("Ring", 1)]),
        order("ord_poison_99", &[("Ring", 1)]),
        order("ord_good_0003", &[("Ring", 1)]),
    ];
    let rasterizer = SelectiveRasterizer {
        inner: BitmapRasterizer::new(),
        poison: "GSOISON_99",
    };
    let mut service = LabelService::with_rasterizer(LabelConfig::new(), rasterizer);

    let batch = service.generate_batch_labels(&orders, &BatchOptions::new()).unwrap();
    assert_eq!(batch.succeeded(), 2);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].order_id, "ord_poison_99");
    assert!(matches!(batch.failures[0].reason, LabelError::Render(_)));
}

/// Sets the cancel flag once the first label has been rasterized.
struct CancellingRasterizer {
    inner: BitmapRasterizer,
    flag: Arc<AtomicBool>,
}

impl Rasterizer for CancellingRasterizer {
    fn rasterize(&mut self, surface: &Surface, scale: u32) -> Result<RasterImage> {
        let image = self.inner.rasterize(surface, scale);
        self.flag.store(true, Ordering::Relaxed);
        image
    }
}

#[test]
fn cancellation_stops_between_orders() {
    let flag = Arc::new(AtomicBool::new(false));
    let orders: Vec<Order> = (1..=3)
        .map(|i| order(&format!("ord_cancel_{i}"), &[("Ring", 1)]))
        .collect();
    let mut rasterizer = CancellingRasterizer {
        inner: BitmapRasterizer::new(),
        flag: Arc::clone(&flag),
    };

    let outcome = assemble_batch(
        &orders,
        &LabelConfig::new(),
        &mut rasterizer,
        &BatchOptions::new().with_cancel_flag(flag),
    )
    .unwrap();

    assert_eq!(outcome.succeeded(), 1);
    assert_eq!(outcome.failed(), 2);
    assert!(outcome
        .failures
        .iter()
        .all(|failure| matches!(failure.reason, LabelError::Cancelled)));
    assert_eq!(outcome.failures[0].order_id, "ord_cancel_2");
}

#[test]
fn exhausted_budget_fails_remaining_orders() {
    let orders = vec![order("ord_slow_1", &[("Ring", 1)]), order("ord_slow_2", &[("Ring", 1)])];
    let options = BatchOptions::new().with_per_label_budget(Duration::ZERO);

    let err = service().generate_batch_labels(&orders, &options).unwrap_err();
    match err {
        LabelError::NothingRendered { failures } => {
            assert_eq!(failures.len(), 2);
            assert!(failures
                .iter()
                .all(|failure| matches!(failure.reason, LabelError::BudgetExceeded)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unbounded_budget_renders_every_order() {
    let config = LabelConfig::new().with_per_label_budget(Duration::MAX);
    let mut service = LabelService::new(config).with_label_date(label_date());
    let orders = vec![order("ord_calm_1", &[("Ring", 1)]), order("ord_calm_2", &[("Ring", 1)])];

    let batch = service.generate_batch_labels(&orders, &BatchOptions::new()).unwrap();
    assert_eq!(batch.succeeded(), 2);
    assert!(batch.failures.is_empty());
}

#[test]
fn downloads_land_in_directory() {
    let dir = std::env::temp_dir().join(format!("shipping-labels-download-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    let mut sink = DirectorySink::new(&dir);

    let filename = service().download_single_label(&Order::demo(), &mut sink).unwrap();
    let saved = fs::read(sink.path_for(&filename)).unwrap();
    assert!(saved.starts_with(b"%PDF"));

    let entries: Vec<String> = fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["shipping-label-GS12345678.pdf".to_owned()]);
    fs::remove_dir_all(&dir).unwrap();
}

#[derive(Clone, Default)]
struct RecordingPrinter {
    events: Rc<RefCell<Vec<String>>>,
}

struct RecordingSurface {
    events: Rc<RefCell<Vec<String>>>,
}

impl PrintSink for RecordingPrinter {
    fn open(&mut self, title: &str) -> Result<Box<dyn PrintSurface>> {
        self.events.borrow_mut().push(format!("open {title}"));
        Ok(Box::new(RecordingSurface {
            events: Rc::clone(&self.events),
        }))
    }
}

impl PrintSurface for RecordingSurface {
    fn write_document(&mut self, pdf: &[u8]) -> Result<()> {
        let kind = if pdf.starts_with(b"%PDF") { "pdf" } else { "other" };
        self.events.borrow_mut().push(format!("write {kind}"));
        Ok(())
    }

    fn request_print(&mut self) -> Result<()> {
        self.events.borrow_mut().push("print".to_owned());
        Ok(())
    }
}

#[test]
fn printing_loads_document_before_requesting_print() {
    if !fonts::default_fonts_available() {
        eprintln!(
            "Skipping printing_loads_document_before_requesting_print: label fonts missing. Set SHIPPING_LABEL_FONTS_DIR."
        );
        return;
    }

    let config = LabelConfig::new().with_print_settle_delay(Duration::ZERO);
    let service = LabelService::new(config).with_label_date(label_date());
    let mut printer = RecordingPrinter::default();

    service.print_single_label(&Order::demo(), &mut printer).unwrap();
    assert_eq!(
        *printer.events.borrow(),
        vec![
            "open Shipping Label - GS12345678".to_owned(),
            "write pdf".to_owned(),
            "print".to_owned()
        ]
    );
}

#[test]
fn printing_invalid_order_never_opens_surface() {
    let mut printer = RecordingPrinter::default();
    let err = service()
        .print_single_label(&order("ord_empty", &[]), &mut printer)
        .unwrap_err();

    assert!(matches!(err, LabelError::InvalidOrder { .. }));
    assert!(printer.events.borrow().is_empty());
}

#[cfg(feature = "bookmarks")]
#[test]
fn batch_outline_has_one_entry_per_page() {
    let orders = vec![
        order("ord_mark_0001", &[("Ring", 1)]),
        order("ord_mark_0002", &[("Ring", 1)]),
    ];
    let batch = service().generate_batch_labels(&orders, &BatchOptions::new()).unwrap();

    let document = Document::load_mem(&batch.bytes).unwrap();
    let outlines = document
        .catalog()
        .and_then(|catalog| catalog.get(b"Outlines"))
        .and_then(Object::as_reference)
        .and_then(|id| document.get_object(id))
        .and_then(Object::as_dict)
        .unwrap();
    assert_eq!(outlines.get(b"Count").and_then(Object::as_i64).unwrap(), 2);
}
