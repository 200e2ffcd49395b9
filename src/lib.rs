//! Shipping label generation and batch PDF assembly.
//!
//! An [`Order`] is mapped to a [`LabelRecord`], laid out on a 100mm x 150mm
//! [`Surface`], rasterized, and placed into a PDF: one label-sized page for a
//! single order, or one A4 page per order for a batch. Labels can also be
//! printed directly as vector documents.
//!
//! ```no_run
//! use shipping_labels::{DirectorySink, LabelConfig, LabelService, Order};
//!
//! # fn run(order: Order) -> shipping_labels::Result<()> {
//! let mut service = LabelService::new(LabelConfig::new());
//! let mut sink = DirectorySink::new("labels");
//! let filename = service.download_single_label(&order, &mut sink)?;
//! println!("saved {filename}");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod elements;
pub mod error;
pub mod fonts;
pub mod label;
pub mod model;
pub mod pipeline;
pub mod raster;
pub mod richtext;
pub mod service;
pub mod surface;
pub mod template;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

pub use config::{LabelConfig, Operator};
pub use dispatch::{DirectorySink, DownloadSink, LpPrinter, PrintSink, PrintSurface};
pub use document::{BatchOptions, BatchOutcome, LabelDocument, PageGeometry};
pub use error::{LabelError, LabelFailure, Result};
pub use label::{map_order_to_label, LabelRecord};
pub use model::{Order, OrderItem, OrderStatus, PaymentStatus, ShippingAddress};
pub use raster::{BitmapRasterizer, RasterImage, Rasterizer};
pub use service::{BatchLabels, LabelDownload, LabelService};
pub use surface::Surface;
pub use template::render_label;
