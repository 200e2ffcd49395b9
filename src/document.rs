//! Page assembly of rasterized labels into PDF documents.
//!
//! Single mode produces one 100mm x 150mm page with the label at the
//! origin. Batch mode produces one A4 page per successfully rendered order,
//! the label centered at its physical size. Batch pages follow the input
//! order and failed orders never leave blank pages.

use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use log::{debug, info, warn};
use printpdf::{Mm, PdfDocument, PdfDocumentReference};

use crate::config::LabelConfig;
use crate::error::{LabelError, LabelFailure, Result};
use crate::label::label_date_today;
use crate::model::Order;
use crate::pipeline::render_order;
use crate::raster::{RasterImage, Rasterizer};
use crate::surface::{Rect, LABEL_HEIGHT_MM, LABEL_WIDTH_MM};

/// Width of an A4 page in millimetres.
pub const A4_WIDTH_MM: f64 = 210.0;

/// Height of an A4 page in millimetres.
pub const A4_HEIGHT_MM: f64 = 297.0;

/// Relative aspect-ratio deviation tolerated before a stretch is logged.
const ASPECT_TOLERANCE: f64 = 0.005;

const LAYER_NAME: &str = "Label";

/// Whether a document holds one label page or a batch of A4 pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentMode {
    Single,
    Batch,
}

/// Physical layout of one document page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    /// Label placement measured from the top-left corner of the page.
    pub label: Rect,
}

impl PageGeometry {
    /// A page exactly the size of one label.
    pub fn single() -> Self {
        Self {
            page_width_mm: LABEL_WIDTH_MM,
            page_height_mm: LABEL_HEIGHT_MM,
            label: Rect::new(0.0, 0.0, LABEL_WIDTH_MM, LABEL_HEIGHT_MM),
        }
    }

    /// An A4 page with the label centered at its physical size.
    pub fn batch() -> Self {
        Self {
            page_width_mm: A4_WIDTH_MM,
            page_height_mm: A4_HEIGHT_MM,
            label: Rect::new(
                (A4_WIDTH_MM - LABEL_WIDTH_MM) / 2.0,
                (A4_HEIGHT_MM - LABEL_HEIGHT_MM) / 2.0,
                LABEL_WIDTH_MM,
                LABEL_HEIGHT_MM,
            ),
        }
    }

    /// Scale factors that stretch `raster` at its DPI onto the label box.
    ///
    /// Mismatched aspect ratios are stretched per axis rather than cropped.
    fn image_scale(&self, raster: &RasterImage) -> (f64, f64) {
        let natural_width = f64::from(raster.width()) / raster.dpi() * crate::MM_PER_INCH;
        let natural_height = f64::from(raster.height()) / raster.dpi() * crate::MM_PER_INCH;
        (
            self.label.width / natural_width,
            self.label.height / natural_height,
        )
    }
}

/// A serialized label document.
#[derive(Clone, Debug)]
pub struct LabelDocument {
    bytes: Vec<u8>,
    mode: DocumentMode,
    pages: Vec<PageGeometry>,
    page_titles: Vec<String>,
}

impl LabelDocument {
    /// The PDF bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the document and returns the PDF bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mode(&self) -> DocumentMode {
        self.mode
    }

    /// Geometry of every page in document order.
    pub fn pages(&self) -> &[PageGeometry] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Order number printed on each page, in document order.
    pub fn page_titles(&self) -> &[String] {
        &self.page_titles
    }
}

/// Places a single rasterized label on a 100mm x 150mm page.
pub fn assemble_single(raster: &RasterImage, order_number: &str) -> Result<LabelDocument> {
    let title = format!("Shipping Label - {order_number}");
    let mut writer = PdfWriter::new(title, DocumentMode::Single);
    writer.add_page(PageGeometry::single(), raster, order_number)?;
    writer
        .finish()?
        .ok_or_else(|| LabelError::Pdf("single label document has no pages".to_owned()))
}

/// Options controlling a batch run.
#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    cancel: Option<Arc<AtomicBool>>,
    per_label_budget: Option<Duration>,
    label_date: Option<NaiveDate>,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `flag` between orders and stops the batch once it is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Overrides the per-label budget from the configuration.
    pub fn with_per_label_budget(mut self, budget: Duration) -> Self {
        self.per_label_budget = Some(budget);
        self
    }

    /// Dates every label of the batch with `date` instead of today.
    pub fn with_label_date(mut self, date: NaiveDate) -> Self {
        self.label_date = Some(date);
        self
    }

    pub fn label_date(&self) -> Option<NaiveDate> {
        self.label_date
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }
}

/// Result of a batch run: the document plus the orders that were skipped.
#[derive(Debug)]
pub struct BatchOutcome {
    pub document: LabelDocument,
    pub failures: Vec<LabelFailure>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.document.page_count()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Renders every order and places each label on its own A4 page.
///
/// Orders are processed sequentially in input order. Per-order failures are
/// recorded and skipped; cancellation and budget exhaustion are checked
/// between orders and record every remaining order as failed. Errors that
/// prevent producing any document are returned immediately.
pub fn assemble_batch<R>(
    orders: &[Order],
    config: &LabelConfig,
    rasterizer: &mut R,
    options: &BatchOptions,
) -> Result<BatchOutcome>
where
    R: Rasterizer + ?Sized,
{
    if orders.is_empty() {
        return Err(LabelError::EmptyBatch);
    }

    let label_date = options.label_date.unwrap_or_else(label_date_today);
    let order_count = u32::try_from(orders.len()).unwrap_or(u32::MAX);
    // A budget too large to add to the clock means no deadline.
    let deadline = options
        .per_label_budget
        .or(config.per_label_budget())
        .and_then(|budget| Instant::now().checked_add(budget.saturating_mul(order_count)));

    let mut writer = PdfWriter::new(
        format!("Shipping Labels ({} orders)", orders.len()),
        DocumentMode::Batch,
    );
    let mut failures = Vec::new();

    for (index, order) in orders.iter().enumerate() {
        let interruption: Option<fn() -> LabelError> = if options.is_cancelled() {
            Some(|| LabelError::Cancelled)
        } else if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
            Some(|| LabelError::BudgetExceeded)
        } else {
            None
        };
        if let Some(reason) = interruption {
            warn!(
                "Batch stopped before order {} ({} of {}): {}",
                order.id,
                index + 1,
                orders.len(),
                reason()
            );
            failures.extend(
                orders[index..]
                    .iter()
                    .map(|order| LabelFailure::new(order.id.as_str(), reason())),
            );
            break;
        }

        let placed = render_order(order, config, rasterizer, label_date).and_then(|rendered| {
            let order_number = rendered.record.order_number();
            writer.add_page(PageGeometry::batch(), &rendered.raster, order_number)
        });
        match placed {
            Ok(()) => {}
            Err(err) if err.is_per_order() => {
                warn!("Skipping order {} in batch: {}", order.id, err);
                failures.push(LabelFailure::new(order.id.as_str(), err));
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        "Batch finished: {} labels rendered, {} failed",
        writer.page_count(),
        failures.len()
    );

    match writer.finish()? {
        Some(document) => Ok(BatchOutcome { document, failures }),
        None => Err(LabelError::NothingRendered { failures }),
    }
}

/// Incremental printpdf document that is only created once the first page
/// arrives, so an all-failed batch never yields an empty file.
struct PdfWriter {
    title: String,
    mode: DocumentMode,
    document: Option<PdfDocumentReference>,
    pages: Vec<PageGeometry>,
    page_titles: Vec<String>,
}

impl PdfWriter {
    fn new(title: String, mode: DocumentMode) -> Self {
        Self {
            title,
            mode,
            document: None,
            pages: Vec::new(),
            page_titles: Vec::new(),
        }
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn add_page(
        &mut self,
        geometry: PageGeometry,
        raster: &RasterImage,
        title: &str,
    ) -> Result<()> {
        let dpi = raster.dpi();
        if raster.width() == 0 || raster.height() == 0 || !dpi.is_finite() || dpi <= 0.0 {
            return Err(LabelError::Render(format!(
                "label {} raster is {}x{} px at {} dpi and cannot be placed",
                title,
                raster.width(),
                raster.height(),
                dpi
            )));
        }

        let width = Mm(geometry.page_width_mm);
        let height = Mm(geometry.page_height_mm);
        let (document, page, layer) = match self.document.take() {
            Some(document) => {
                let (page, layer) = document.add_page(width, height, LAYER_NAME);
                (document, page, layer)
            }
            None => PdfDocument::new(self.title.as_str(), width, height, LAYER_NAME),
        };

        let expected = geometry.label.width / geometry.label.height;
        let actual = f64::from(raster.width()) / f64::from(raster.height());
        if ((actual - expected) / expected).abs() > ASPECT_TOLERANCE {
            warn!(
                "Label {} raster is {}x{} px; stretching to {}x{} mm",
                title,
                raster.width(),
                raster.height(),
                geometry.label.width,
                geometry.label.height
            );
        }

        let (scale_x, scale_y) = geometry.image_scale(raster);
        let layer = document.get_page(page).get_layer(layer);
        let image = printpdf::Image::from_dynamic_image(&raster.to_dynamic_image());
        // printpdf measures from the bottom-left corner of the page.
        let bottom = geometry.page_height_mm - geometry.label.bottom();
        image.add_to_layer(
            layer,
            Some(Mm(geometry.label.x)),
            Some(Mm(bottom)),
            None,
            Some(scale_x),
            Some(scale_y),
            Some(raster.dpi()),
        );

        debug!("Placed label {} on page {}", title, self.pages.len() + 1);
        self.document = Some(document);
        self.pages.push(geometry);
        self.page_titles.push(title.to_owned());
        Ok(())
    }

    fn finish(self) -> Result<Option<LabelDocument>> {
        let Some(document) = self.document else {
            return Ok(None);
        };

        let mut bytes = Vec::new();
        {
            let mut writer = BufWriter::new(&mut bytes);
            document
                .save(&mut writer)
                .map_err(|err| LabelError::Pdf(format!("{err:?}")))?;
            writer.flush()?;
        }

        #[cfg(feature = "bookmarks")]
        let bytes = if self.mode == DocumentMode::Batch {
            crate::bookmarks::apply_page_bookmarks(&bytes, &self.page_titles)
                .map_err(|err| LabelError::Pdf(err.to_string()))?
        } else {
            bytes
        };

        Ok(Some(LabelDocument {
            bytes,
            mode: self.mode,
            pages: self.pages,
            page_titles: self.page_titles,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn raster(width: u32, height: u32, dpi: f64) -> RasterImage {
        RasterImage::new(RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255])), dpi)
    }

    #[test]
    fn batch_geometry_centers_label_on_a4() {
        let geometry = PageGeometry::batch();
        assert_eq!(geometry.label.x, 55.0);
        assert_eq!(geometry.label.y, 73.5);
        assert_eq!((geometry.label.width, geometry.label.height), (100.0, 150.0));
    }

    #[test]
    fn image_scale_maps_raster_onto_label_box() {
        let (sx, sy) = PageGeometry::single().image_scale(&raster(756, 1134, 192.0));
        let natural = 756.0 / 192.0 * crate::MM_PER_INCH;
        assert!((sx * natural - 100.0).abs() < 1e-9);
        assert!((sx - sy).abs() < 1e-3);
    }

    #[test]
    fn mismatched_aspect_is_stretched_not_cropped() {
        let (sx, sy) = PageGeometry::single().image_scale(&raster(400, 400, 100.0));
        let natural = 400.0 / 100.0 * crate::MM_PER_INCH;
        assert!((sx * natural - 100.0).abs() < 1e-9);
        assert!((sy * natural - 150.0).abs() < 1e-9);
    }

    #[test]
    fn single_document_has_one_label_page() {
        let document = assemble_single(&raster(756, 1134, 192.0), "GS12345678").unwrap();
        assert_eq!(document.mode(), DocumentMode::Single);
        assert_eq!(document.pages(), &[PageGeometry::single()]);
        assert!(document.bytes().starts_with(b"%PDF"));
    }

    #[test]
    fn empty_batch_fails_before_rendering() {
        struct Unreachable;
        impl Rasterizer for Unreachable {
            fn rasterize(&mut self, _: &crate::surface::Surface, _: u32) -> Result<RasterImage> {
                panic!("no rendering expected for an empty batch")
            }
        }
        let err = assemble_batch(&[], &LabelConfig::new(), &mut Unreachable, &BatchOptions::new())
            .unwrap_err();
        assert!(matches!(err, LabelError::EmptyBatch));
    }

    #[test]
    fn unplaceable_raster_is_a_render_error() {
        for bad in [raster(756, 1134, 0.0), raster(756, 1134, f64::NAN), raster(0, 0, 192.0)] {
            let err = assemble_single(&bad, "GS12345678").unwrap_err();
            assert!(matches!(err, LabelError::Render(_)), "unexpected error: {err}");
        }
    }

    /// Returns a zero-DPI image for the first label and valid ones afterwards.
    struct ZeroDpiOnce {
        calls: usize,
    }

    impl Rasterizer for ZeroDpiOnce {
        fn rasterize(&mut self, _: &crate::surface::Surface, _: u32) -> Result<RasterImage> {
            self.calls += 1;
            let dpi = if self.calls == 1 { 0.0 } else { 192.0 };
            Ok(raster(756, 1134, dpi))
        }
    }

    fn dated_options() -> BatchOptions {
        BatchOptions::new().with_label_date(NaiveDate::from_ymd_opt(2025, 1, 16).unwrap())
    }

    #[test]
    fn unplaceable_raster_fails_only_its_order() {
        let mut second = Order::demo();
        second.id = "demo_order_87654321".to_owned();
        let orders = [Order::demo(), second];
        let mut rasterizer = ZeroDpiOnce { calls: 0 };

        let config = LabelConfig::new();
        let outcome = assemble_batch(&orders, &config, &mut rasterizer, &dated_options()).unwrap();

        assert_eq!(outcome.succeeded(), 1);
        assert_eq!(outcome.document.page_titles(), &["GS87654321"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].order_id, "demo_order_12345678");
        assert!(matches!(outcome.failures[0].reason, LabelError::Render(_)));
    }

    #[test]
    fn unbounded_budget_sets_no_deadline() {
        let options = dated_options().with_per_label_budget(Duration::MAX);
        let mut rasterizer = crate::raster::BitmapRasterizer::new();

        let config = LabelConfig::new();
        let outcome = assemble_batch(&[Order::demo()], &config, &mut rasterizer, &options).unwrap();

        assert_eq!(outcome.succeeded(), 1);
        assert!(outcome.failures.is_empty());
    }
}
