//! Order -> label record -> surface -> raster, for one order.

use chrono::NaiveDate;
use log::debug;

use crate::config::LabelConfig;
use crate::error::Result;
use crate::label::{map_order_to_label_on, LabelRecord};
use crate::model::Order;
use crate::raster::{RasterImage, Rasterizer};
use crate::template::render_label;

/// A label that made it through mapping, rendering and rasterization.
#[derive(Clone, Debug)]
pub struct RenderedLabel {
    pub record: LabelRecord,
    pub raster: RasterImage,
}

/// Runs the full per-order pipeline.
///
/// Any failure concerns this order only; callers decide whether to
/// propagate it or record it and move on.
pub fn render_order<R>(
    order: &Order,
    config: &LabelConfig,
    rasterizer: &mut R,
    label_date: NaiveDate,
) -> Result<RenderedLabel>
where
    R: Rasterizer + ?Sized,
{
    let record = map_order_to_label_on(order, config, label_date)?;
    let surface = render_label(&record, config);
    let raster = rasterizer.rasterize(&surface, config.raster_scale())?;
    debug!(
        "Rendered label {} for order {} at {}x{} px",
        record.order_number(),
        order.id,
        raster.width(),
        raster.height()
    );
    Ok(RenderedLabel { record, raster })
}
