//! Order record and its item snapshots

use super::OrderStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One line of an order
///
/// `unit_price` is the catalog price captured when the order was placed and
/// is never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl OrderItem {
    pub fn new(name: impl Into<String>, unit_price: Decimal, quantity: u32) -> Self {
        Self {
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// unit_price × quantity
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// How a bill was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Qr,
}

impl PaymentMethod {
    /// Card and QR go through the payment gateway; cash does not
    pub fn needs_gateway(&self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => f.write_str("cash"),
            PaymentMethod::Card => f.write_str("card"),
            PaymentMethod::Qr => f.write_str("qr"),
        }
    }
}

/// One ticket for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Opaque unique id (UUID v4)
    pub id: String,
    /// `YYYYMMDD-NNN`, unique within the business day
    pub order_number: String,
    pub table_id: String,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    /// Terminal once true
    pub paid: bool,
    /// Unix millis
    pub created_at: i64,
    /// Unix millis, set when the kitchen completes the order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<i64>,
    /// Unix millis, set at settlement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    /// Number of transitions applied
    #[serde(default)]
    pub version: u64,
    /// Global change sequence of the latest write to this order
    #[serde(default)]
    pub last_sequence: u64,
    /// Order number came from the fallback namespace and is not guaranteed unique
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded_number: bool,
}

impl Order {
    /// Σ unit_price × quantity
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    /// Not paid and not declined
    pub fn is_open(&self) -> bool {
        !self.paid && !self.status.is_terminal()
    }
}

/// Requested line of a new order
///
/// `unit_price` may be omitted when the server resolves prices from its
/// catalog; a catalog price always wins over a client-supplied one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    #[serde(default)]
    pub name: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: u32,
}

impl OrderItemInput {
    pub fn priced(name: impl Into<String>, unit_price: Decimal, quantity: u32) -> Self {
        Self {
            name: name.into(),
            unit_price: Some(unit_price),
            quantity,
        }
    }
}

/// Request body for creating an order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    #[serde(default)]
    pub table_id: String,
    #[serde(default)]
    pub items: Vec<OrderItemInput>,
}

/// Response to a create request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub order: Order,
    /// Operator-facing warnings (degraded order number)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with(items: Vec<OrderItem>) -> Order {
        Order {
            id: "o-1".into(),
            order_number: "20261019-001".into(),
            table_id: "5".into(),
            items,
            status: OrderStatus::Pending,
            paid: false,
            created_at: 0,
            processed_at: None,
            paid_at: None,
            payment_method: None,
            version: 0,
            last_sequence: 1,
            degraded_number: false,
        }
    }

    #[test]
    fn test_subtotal() {
        let order = order_with(vec![
            OrderItem::new("burger", Decimal::from(10), 2),
            OrderItem::new("fries", Decimal::new(350, 2), 1),
        ]);
        assert_eq!(order.subtotal(), Decimal::new(2350, 2));
    }

    #[test]
    fn test_order_json_shape() {
        let order = order_with(vec![OrderItem::new("burger", Decimal::from(10), 2)]);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["orderNumber"], "20261019-001");
        assert_eq!(json["tableId"], "5");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["items"][0]["unitPrice"], 10.0);
        assert!(json.get("paymentMethod").is_none());
        assert!(json.get("degradedNumber").is_none());
    }

    #[test]
    fn test_payment_method_gateway() {
        assert!(!PaymentMethod::Cash.needs_gateway());
        assert!(PaymentMethod::Card.needs_gateway());
        assert!(PaymentMethod::Qr.needs_gateway());
    }
}
