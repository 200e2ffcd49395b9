use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use shipping_labels::builder::render_surface_pdf;
use shipping_labels::{
    fonts, map_order_to_label, render_label, LabelConfig, LabelService, Order, Surface,
};

fn demo_surface() -> Surface {
    let config = LabelConfig::new();
    let record = map_order_to_label(&Order::demo(), &config).expect("demo order maps");
    render_label(&record, &config)
}

fn render_print_pdf() -> Option<Vec<u8>> {
    if !fonts::default_fonts_available() {
        return None;
    }
    Some(render_surface_pdf(&demo_surface()).expect("render print document"))
}

/// Blanks out the timestamps and identifiers the PDF writer varies per run.
fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn blank_between(data: &mut [u8], open: &[u8], close: &[u8], keep: &[u8]) {
        let mut offset = 0;
        while let Some(found) = data[offset..].windows(open.len()).position(|w| w == open) {
            let start = offset + found + open.len();
            let Some(length) = data[start..].windows(close.len()).position(|w| w == close) else {
                break;
            };
            for byte in &mut data[start..start + length] {
                if !keep.contains(byte) {
                    *byte = b'0';
                }
            }
            offset = start + length + close.len();
        }
    }

    let whitespace: &[u8] = b" \n\r\t";
    let hex_delimiters: &[u8] = b"<> \n\r\t";
    let mut normalized = bytes.to_vec();
    blank_between(&mut normalized, b"/CreationDate(", b")", &[]);
    blank_between(&mut normalized, b"/ModDate(", b")", &[]);
    blank_between(&mut normalized, b"/Producer(", b")", &[]);
    blank_between(&mut normalized, b"/ID[", b"]", hex_delimiters);
    for tag in [
        "xmp:CreateDate",
        "xmp:ModifyDate",
        "xmp:MetadataDate",
        "xmpMM:DocumentID",
        "xmpMM:InstanceID",
        "xmpMM:VersionID",
    ] {
        let open = format!("<{tag}>");
        let close = format!("</{tag}>");
        blank_between(&mut normalized, open.as_bytes(), close.as_bytes(), whitespace);
    }
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(scrub_pdf(bytes)).into()
}

#[test]
fn print_document_is_a_pdf() {
    let Some(bytes) = render_print_pdf() else {
        eprintln!(
            "Skipping print_document_is_a_pdf: label fonts missing. Set SHIPPING_LABEL_FONTS_DIR."
        );
        return;
    };
    assert!(bytes.starts_with(b"%PDF"));

    let document = lopdf::Document::load_mem(&bytes).expect("print document parses");
    assert_eq!(document.get_pages().len(), 1);
}

#[test]
fn print_document_is_deterministic() {
    let (Some(first), Some(second)) = (render_print_pdf(), render_print_pdf()) else {
        eprintln!(
            "Skipping print_document_is_deterministic: label fonts missing. Set SHIPPING_LABEL_FONTS_DIR."
        );
        return;
    };
    assert_eq!(first.len(), second.len(), "PDF sizes should match");
    assert_eq!(normalized_hash(&first), normalized_hash(&second));
}

#[test]
fn single_label_document_is_deterministic() {
    let date = NaiveDate::from_ymd_opt(2025, 1, 16).expect("valid date");
    let render = || {
        LabelService::new(LabelConfig::new())
            .with_label_date(date)
            .generate_single_label(&Order::demo())
            .expect("demo label renders")
            .bytes
    };
    let (first, second) = (render(), render());
    assert_eq!(normalized_hash(&first), normalized_hash(&second));
}
