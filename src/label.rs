//! Normalized label records and the order-to-label mapper.
//!
//! [`map_order_to_label_on`] is a pure function: given the same order,
//! configuration and label date it always returns an identical
//! [`LabelRecord`]. Locale formatting helpers for the en-IN conventions used
//! on printed labels live here as well so the renderer never formats raw
//! values itself.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};

use crate::config::{LabelConfig, Operator};
use crate::error::{LabelError, Result};
use crate::model::{Order, OrderItem};

/// Number of trailing order-id characters kept in the order number.
pub const ORDER_NUMBER_SUFFIX_LEN: usize = 8;

/// Number of trailing product-id characters kept in an item short code.
pub const ITEM_CODE_LEN: usize = 6;

/// Offset of India Standard Time, the timezone labels are dated in.
const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

/// A named multi-line postal block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressBlock {
    pub name: String,
    pub lines: Vec<String>,
}

/// One printed line of the contents list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelItem {
    pub name: String,
    pub quantity: u32,
    /// Short product code; absent when the source item has no product id.
    pub code: Option<String>,
}

/// Everything printed on one shipping label, independent of any renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelRecord {
    order_id: String,
    order_number: String,
    ship_to: AddressBlock,
    ship_from: AddressBlock,
    customer_email: String,
    customer_phone: Option<String>,
    line_items: Vec<LabelItem>,
    total_amount: f64,
    order_date: NaiveDate,
    label_date: NaiveDate,
    weight: Option<String>,
    dimensions: Option<String>,
}

impl LabelRecord {
    /// Identifier of the order the label was derived from.
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Short human-readable order code, e.g. `GS12345678`.
    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn ship_to(&self) -> &AddressBlock {
        &self.ship_to
    }

    pub fn ship_from(&self) -> &AddressBlock {
        &self.ship_from
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    pub fn customer_phone(&self) -> Option<&str> {
        self.customer_phone.as_deref()
    }

    /// Items in the order they appear in the source order. Never empty.
    pub fn line_items(&self) -> &[LabelItem] {
        &self.line_items
    }

    /// Sum of all item quantities.
    pub fn item_count(&self) -> u64 {
        self.line_items
            .iter()
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }

    /// Total formatted with en-IN digit grouping and no decimals.
    pub fn formatted_total(&self) -> String {
        format_amount(self.total_amount)
    }

    pub fn order_date(&self) -> NaiveDate {
        self.order_date
    }

    pub fn label_date(&self) -> NaiveDate {
        self.label_date
    }

    pub fn weight(&self) -> Option<&str> {
        self.weight.as_deref()
    }

    pub fn dimensions(&self) -> Option<&str> {
        self.dimensions.as_deref()
    }
}

/// Maps an order to a label dated today (India Standard Time).
pub fn map_order_to_label(order: &Order, config: &LabelConfig) -> Result<LabelRecord> {
    map_order_to_label_on(order, config, label_date_today())
}

/// Maps an order to a label carrying the given label date.
///
/// Fails with [`LabelError::InvalidOrder`] when the order has no items, no
/// shipping address, a blank address component, or a non-finite total.
pub fn map_order_to_label_on(
    order: &Order,
    config: &LabelConfig,
    label_date: NaiveDate,
) -> Result<LabelRecord> {
    if order.items.is_empty() {
        return Err(LabelError::invalid_order(&order.id, "order has no line items"));
    }

    let address = order
        .shipping_address
        .as_ref()
        .ok_or_else(|| LabelError::invalid_order(&order.id, "shipping address is missing"))?;

    for (field, value) in [
        ("street", &address.street),
        ("city", &address.city),
        ("state", &address.state),
        ("postal code", &address.pincode),
    ] {
        if value.trim().is_empty() {
            return Err(LabelError::invalid_order(
                &order.id,
                format!("shipping address is missing the {field}"),
            ));
        }
    }

    if !order.total_amount.is_finite() {
        return Err(LabelError::invalid_order(
            &order.id,
            "total amount is not a finite number",
        ));
    }

    let ship_to = AddressBlock {
        name: order.customer_name.trim().to_owned(),
        lines: vec![
            address.street.trim().to_owned(),
            format!("{}, {}", address.city.trim(), address.state.trim()),
            format!("PIN: {}", address.pincode.trim()),
        ],
    };

    Ok(LabelRecord {
        order_id: order.id.clone(),
        order_number: derive_order_number(config.order_tag(), &order.id),
        ship_to,
        ship_from: ship_from_block(config.operator()),
        customer_email: order.customer_email.clone(),
        customer_phone: non_blank(order.customer_phone.as_deref()),
        line_items: order.items.iter().map(label_item).collect(),
        total_amount: order.total_amount,
        order_date: india_date(order.created_at),
        label_date,
        weight: non_blank(order.weight.as_deref()),
        dimensions: non_blank(order.dimensions.as_deref()),
    })
}

/// Builds the order number: tag plus the last eight id characters, uppercased.
///
/// Shorter identifiers are used in full without padding.
pub fn derive_order_number(tag: &str, order_id: &str) -> String {
    format!("{tag}{}", trailing_upper(order_id, ORDER_NUMBER_SUFFIX_LEN))
}

/// Formats a currency value with en-IN grouping (`12,34,567`) and no decimals.
pub fn format_amount(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let len = digits.len();

    let mut grouped = String::with_capacity(len + len / 2 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (index, ch) in digits.chars().enumerate() {
        let remaining = len - index;
        if index > 0 && (remaining == 3 || (remaining > 3 && (remaining - 3) % 2 == 0)) {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Formats a date the en-IN way: day/month/year without zero padding.
pub fn format_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// Today's date in India Standard Time.
pub fn label_date_today() -> NaiveDate {
    india_date(Utc::now())
}

fn india_date(timestamp: DateTime<Utc>) -> NaiveDate {
    match FixedOffset::east_opt(IST_OFFSET_SECONDS) {
        Some(offset) => timestamp.with_timezone(&offset).date_naive(),
        None => timestamp.date_naive(),
    }
}

fn ship_from_block(operator: &Operator) -> AddressBlock {
    AddressBlock {
        name: operator.name.clone(),
        lines: vec![
            operator.address.clone(),
            operator.city.clone(),
            format!("Phone: {}", operator.phone),
        ],
    }
}

fn label_item(item: &OrderItem) -> LabelItem {
    let code = item
        .product_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| trailing_upper(id, ITEM_CODE_LEN));

    LabelItem {
        name: item.product_name.trim().to_owned(),
        quantity: item.quantity,
        code,
    }
}

fn trailing_upper(value: &str, count: usize) -> String {
    let skip = value.chars().count().saturating_sub(count);
    value.chars().skip(skip).collect::<String>().to_uppercase()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
