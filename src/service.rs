//! Entry points for host applications.
//!
//! [`LabelService`] owns the configuration and a rasterizer and exposes the
//! single, batch, print and preview operations. Single-label calls propagate
//! every failure; batch calls isolate per-order failures and report them in
//! [`BatchLabels::failures`].

use chrono::{NaiveDate, Utc};
use log::info;

use crate::config::LabelConfig;
use crate::dispatch::{
    batch_filename, print_surface, single_label_filename, DownloadSink, PrintSink,
};
use crate::document::{assemble_batch, assemble_single, BatchOptions};
use crate::error::{LabelFailure, Result};
use crate::label::{label_date_today, map_order_to_label_on};
use crate::model::Order;
use crate::pipeline::render_order;
use crate::raster::{BitmapRasterizer, RasterImage, Rasterizer};
use crate::template::render_label;

/// A finished single-label document ready to be saved.
#[derive(Clone, Debug)]
pub struct LabelDownload {
    pub order_number: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A finished batch document plus the orders that did not make it in.
#[derive(Debug)]
pub struct BatchLabels {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub failures: Vec<LabelFailure>,
}

impl BatchLabels {
    pub fn succeeded(&self) -> usize {
        self.page_count
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Label generation facade.
pub struct LabelService<R = BitmapRasterizer> {
    config: LabelConfig,
    rasterizer: R,
    label_date: Option<NaiveDate>,
}

impl LabelService<BitmapRasterizer> {
    /// Creates a service that rasterizes with the bundled bitmap renderer.
    pub fn new(config: LabelConfig) -> Self {
        Self::with_rasterizer(config, BitmapRasterizer::new())
    }
}

impl Default for LabelService<BitmapRasterizer> {
    fn default() -> Self {
        Self::new(LabelConfig::default())
    }
}

impl<R: Rasterizer> LabelService<R> {
    pub fn with_rasterizer(config: LabelConfig, rasterizer: R) -> Self {
        Self {
            config,
            rasterizer,
            label_date: None,
        }
    }

    /// Prints `date` as the label date instead of today.
    pub fn with_label_date(mut self, date: NaiveDate) -> Self {
        self.label_date = Some(date);
        self
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    fn label_date(&self) -> NaiveDate {
        self.label_date.unwrap_or_else(label_date_today)
    }

    /// Renders one order into a 100mm x 150mm single-page document.
    pub fn generate_single_label(&mut self, order: &Order) -> Result<LabelDownload> {
        let label_date = self.label_date();
        let rendered = render_order(order, &self.config, &mut self.rasterizer, label_date)?;
        let order_number = rendered.record.order_number().to_owned();
        let document = assemble_single(&rendered.raster, &order_number)?;
        info!("Generated label {} for order {}", order_number, order.id);
        Ok(LabelDownload {
            filename: single_label_filename(&order_number),
            order_number,
            bytes: document.into_bytes(),
        })
    }

    /// Generates a single label and saves it through `sink`.
    ///
    /// Returns the filename the document was saved under.
    pub fn download_single_label(
        &mut self,
        order: &Order,
        sink: &mut dyn DownloadSink,
    ) -> Result<String> {
        let download = self.generate_single_label(order)?;
        sink.save(&download.filename, &download.bytes)?;
        Ok(download.filename)
    }

    /// Prints one order's label as a vector document through `sink`.
    pub fn print_single_label(&self, order: &Order, sink: &mut dyn PrintSink) -> Result<()> {
        let record = map_order_to_label_on(order, &self.config, self.label_date())?;
        let surface = render_label(&record, &self.config);
        print_surface(&surface, &self.config, sink)?;
        info!("Printed label {} for order {}", record.order_number(), order.id);
        Ok(())
    }

    /// Renders a rasterized preview of one order's label.
    pub fn preview_label(&mut self, order: &Order) -> Result<RasterImage> {
        let label_date = self.label_date();
        let rendered = render_order(order, &self.config, &mut self.rasterizer, label_date)?;
        Ok(rendered.raster)
    }

    /// Renders every order into one A4 batch document.
    pub fn generate_batch_labels(
        &mut self,
        orders: &[Order],
        options: &BatchOptions,
    ) -> Result<BatchLabels> {
        let options = match (self.label_date, options.label_date()) {
            (Some(date), None) => options.clone().with_label_date(date),
            _ => options.clone(),
        };
        let outcome = assemble_batch(orders, &self.config, &mut self.rasterizer, &options)?;
        Ok(BatchLabels {
            filename: batch_filename(Utc::now()),
            page_count: outcome.document.page_count(),
            bytes: outcome.document.into_bytes(),
            failures: outcome.failures,
        })
    }

    /// Generates a batch document and saves it through `sink`.
    pub fn download_batch_labels(
        &mut self,
        orders: &[Order],
        options: &BatchOptions,
        sink: &mut dyn DownloadSink,
    ) -> Result<BatchLabels> {
        let batch = self.generate_batch_labels(orders, options)?;
        sink.save(&batch.filename, &batch.bytes)?;
        Ok(batch)
    }
}
