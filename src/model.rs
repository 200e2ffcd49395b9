//! Order records consumed by the label pipeline.
//!
//! These types mirror the read-only order documents handed over by the
//! order-management collaborator. Field names serialize in camelCase so a
//! host application can pass its JSON payloads straight through. Nothing in
//! this crate mutates an [`Order`]; labels are always derived from a borrowed
//! record.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an order as reported by the order service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created but not yet confirmed.
    #[default]
    Pending,
    /// Confirmed and being packed.
    Processing,
    /// Handed over to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Cancelled before shipping.
    Cancelled,
}

/// Payment state of an order as reported by the order service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting payment.
    #[default]
    Pending,
    /// Payment captured.
    Completed,
    /// Payment attempt failed.
    Failed,
    /// Payment returned to the customer.
    Refunded,
}

/// Postal destination of an order.
///
/// Every field is required for labelling; blank values are rejected by
/// [`crate::label::map_order_to_label`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl ShippingAddress {
    /// Creates an address from its four components.
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        pincode: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            state: state.into(),
            pincode: pincode.into(),
        }
    }
}

/// A single ordered product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default)]
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: u32,
    /// Unit price; informational only, labels print the order total.
    #[serde(default)]
    pub price: Option<f64>,
}

impl OrderItem {
    /// Creates an item without a product identifier.
    pub fn new(product_name: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_name: product_name.into(),
            quantity,
            ..Self::default()
        }
    }

    /// Sets the product identifier and returns the updated item.
    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    /// Sets the unit price and returns the updated item.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}

/// Read-only order record owned by the order-management collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Package weight as entered by the packer, e.g. `"250 g"`.
    #[serde(default)]
    pub weight: Option<String>,
    /// Package dimensions as entered by the packer, e.g. `"10x8x4 cm"`.
    #[serde(default)]
    pub dimensions: Option<String>,
}

impl Order {
    /// Creates an order with no items and no address.
    pub fn new(
        id: impl Into<String>,
        customer_name: impl Into<String>,
        total_amount: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            customer_name: customer_name.into(),
            customer_email: String::new(),
            customer_phone: None,
            shipping_address: None,
            items: Vec::new(),
            total_amount,
            created_at,
            status: OrderStatus::default(),
            payment_status: PaymentStatus::default(),
            weight: None,
            dimensions: None,
        }
    }

    /// Sets the shipping address and returns the updated order.
    pub fn with_address(mut self, address: ShippingAddress) -> Self {
        self.shipping_address = Some(address);
        self
    }

    /// Appends an item and returns the updated order.
    pub fn with_item(mut self, item: OrderItem) -> Self {
        self.items.push(item);
        self
    }

    /// Sets the customer contact details and returns the updated order.
    pub fn with_contact(
        mut self,
        email: impl Into<String>,
        phone: impl Into<Option<String>>,
    ) -> Self {
        self.customer_email = email.into();
        self.customer_phone = phone.into();
        self
    }

    /// Sets the lifecycle and payment states and returns the updated order.
    pub fn with_status(mut self, status: OrderStatus, payment_status: PaymentStatus) -> Self {
        self.status = status;
        self.payment_status = payment_status;
        self
    }

    /// The sample order used by the demo command: two jewellery items worth
    /// INR 19,998 placed on 15 January 2025, 10:30 IST.
    pub fn demo() -> Self {
        let created_at = Utc
            .with_ymd_and_hms(2025, 1, 15, 5, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self::new("demo_order_12345678", "Priya Sharma", 19998.0, created_at)
            .with_contact("priya.sharma@example.com", Some("+91 98765 43210".to_owned()))
            .with_address(ShippingAddress::new(
                "123 Rose Garden, MG Road",
                "Bangalore",
                "Karnataka",
                "560001",
            ))
            .with_item(
                OrderItem::new("Elegant Ruby Heart Pendant", 1)
                    .with_product_id("ruby_pendant_001")
                    .with_price(15999.0),
            )
            .with_item(
                OrderItem::new("Gold Plated Chain (18 inch)", 1)
                    .with_product_id("gold_chain_002")
                    .with_price(3999.0),
            )
            .with_status(OrderStatus::Processing, PaymentStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_payload() {
        let json = r#"{
            "id": "ord_1",
            "customerName": "Asha",
            "customerEmail": "asha@example.com",
            "shippingAddress": {"street": "1 Lane", "city": "Pune", "state": "MH", "pincode": "411001"},
            "items": [{"productId": "prod_abcdef", "productName": "Ring", "quantity": 2}],
            "totalAmount": 4500,
            "createdAt": "2025-01-15T10:30:00Z",
            "status": "processing",
            "paymentStatus": "completed"
        }"#;

        let order: Order = serde_json::from_str(json).expect("order parses");
        assert_eq!(order.customer_name, "Asha");
        assert_eq!(order.items[0].product_id.as_deref(), Some("prod_abcdef"));
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert_eq!(
            order.shipping_address.map(|address| address.pincode),
            Some("411001".to_owned())
        );
    }
}
