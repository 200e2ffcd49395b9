//! Process-wide label settings.

use std::time::Duration;

/// Smallest raster scale that still yields print-legible labels.
pub const MIN_RASTER_SCALE: u32 = 2;

/// Identity of the business shipping the parcels; printed in the header and
/// in the "Ship From" block of every label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operator {
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub website: String,
}

impl Default for Operator {
    fn default() -> Self {
        Self {
            name: "Global Saanvika".to_owned(),
            address: "123 Jewelry Street, Artisan Quarter".to_owned(),
            city: "Mumbai, Maharashtra 400001".to_owned(),
            phone: "+91 98765 43210".to_owned(),
            email: "orders@globalsaanvika.com".to_owned(),
            website: "www.globalsaanvika.com".to_owned(),
        }
    }
}

/// Settings shared by the mapper, renderer, rasterizer and dispatcher.
///
/// Defaults reproduce the stock 100mm x 150mm label: two-letter tag `GS`,
/// a 96 DPI template rasterized at 2x and a 500ms print settle delay.
#[derive(Clone, Debug)]
pub struct LabelConfig {
    operator: Operator,
    order_tag: String,
    currency_prefix: String,
    handling_notice: String,
    template_dpi: f64,
    raster_scale: u32,
    print_settle_delay: Duration,
    per_label_budget: Option<Duration>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            operator: Operator::default(),
            order_tag: "GS".to_owned(),
            currency_prefix: "INR".to_owned(),
            handling_notice: "Handle with Care - Premium Jewelry".to_owned(),
            template_dpi: 96.0,
            raster_scale: MIN_RASTER_SCALE,
            print_settle_delay: Duration::from_millis(500),
            per_label_budget: None,
        }
    }
}

impl LabelConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Organization tag prefixed to every order number.
    pub fn order_tag(&self) -> &str {
        &self.order_tag
    }

    pub fn currency_prefix(&self) -> &str {
        &self.currency_prefix
    }

    pub fn handling_notice(&self) -> &str {
        &self.handling_notice
    }

    /// Resolution the template is laid out at before scaling.
    pub fn template_dpi(&self) -> f64 {
        self.template_dpi
    }

    pub fn raster_scale(&self) -> u32 {
        self.raster_scale
    }

    /// Delay between opening a print surface and requesting the print dialog.
    pub fn print_settle_delay(&self) -> Duration {
        self.print_settle_delay
    }

    /// Wall-clock ceiling per label; batches get this times the order count.
    pub fn per_label_budget(&self) -> Option<Duration> {
        self.per_label_budget
    }

    /// Sets the operator identity and returns the updated configuration.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    /// Sets the order-number tag and returns the updated configuration.
    pub fn with_order_tag(mut self, tag: impl Into<String>) -> Self {
        self.order_tag = tag.into();
        self
    }

    /// Sets the currency prefix and returns the updated configuration.
    pub fn with_currency_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.currency_prefix = prefix.into();
        self
    }

    /// Sets the footer handling notice and returns the updated configuration.
    pub fn with_handling_notice(mut self, notice: impl Into<String>) -> Self {
        self.handling_notice = notice.into();
        self
    }

    /// Sets the template DPI and returns the updated configuration.
    pub fn with_template_dpi(mut self, dpi: f64) -> Self {
        self.template_dpi = dpi;
        self
    }

    /// Sets the raster scale, clamped to [`MIN_RASTER_SCALE`].
    pub fn with_raster_scale(mut self, scale: u32) -> Self {
        self.raster_scale = scale.max(MIN_RASTER_SCALE);
        self
    }

    /// Sets the print settle delay and returns the updated configuration.
    pub fn with_print_settle_delay(mut self, delay: Duration) -> Self {
        self.print_settle_delay = delay;
        self
    }

    /// Sets the per-label wall-clock budget and returns the updated configuration.
    pub fn with_per_label_budget(mut self, budget: impl Into<Option<Duration>>) -> Self {
        self.per_label_budget = budget.into();
        self
    }
}
