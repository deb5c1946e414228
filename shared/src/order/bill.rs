//! Bill DTOs exchanged with the checkout role
//!
//! A bill has no identity of its own; it is recomputed from the table's
//! payment-ready orders on every read.

use super::{OrderItem, PaymentMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Merged view of one table's payment-ready orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub table_id: String,
    /// Constituent orders, oldest first
    pub order_ids: Vec<String>,
    pub order_numbers: Vec<String>,
    /// Concatenation of the constituent orders' items
    pub items: Vec<OrderItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
}

/// Settlement or quote request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleBillRequest {
    pub payment_method: PaymentMethod,
    /// Percent off the subtotal, applied only at settlement time
    #[serde(default, with = "rust_decimal::serde::float")]
    pub discount_percent: Decimal,
    /// Cash handed over; required for cash
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub tendered_amount: Option<Decimal>,
    /// Orders the cashier was looking at; settlement is refused if the bill
    /// no longer has exactly these
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_order_ids: Option<Vec<String>>,
}

/// Priced bill without side effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillQuote {
    pub table_id: String,
    pub order_ids: Vec<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub final_total: Decimal,
    /// Cash only
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub change: Option<Decimal>,
}

/// Result of a fully successful settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub table_id: String,
    pub settled_order_ids: Vec<String>,
    pub payment_method: PaymentMethod,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub final_total: Decimal,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub change: Option<Decimal>,
}

/// One constituent order that did not settle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedSettlement {
    pub order_id: String,
    pub reason: String,
}
