//! Order change notifications and subscription topics

use super::{Order, OrderStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderEventType {
    #[serde(rename = "order.created")]
    Created,
    #[serde(rename = "order.statusChanged")]
    StatusChanged,
    #[serde(rename = "order.paid")]
    Paid,
    #[serde(rename = "order.declined")]
    Declined,
}

impl fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderEventType::Created => f.write_str("order.created"),
            OrderEventType::StatusChanged => f.write_str("order.statusChanged"),
            OrderEventType::Paid => f.write_str("order.paid"),
            OrderEventType::Declined => f.write_str("order.declined"),
        }
    }
}

/// Notification emitted after a committed write
///
/// `order` is the full post-write state, so a consumer never needs a
/// follow-up read to decide queue membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub event_id: String,
    pub event_type: OrderEventType,
    /// Equals `order.last_sequence`
    pub sequence: u64,
    /// Server instance that produced the event
    pub epoch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<OrderStatus>,
    pub order: Order,
    /// Unix millis
    pub timestamp: i64,
}

impl OrderEvent {
    pub fn new(
        event_type: OrderEventType,
        previous_status: Option<OrderStatus>,
        order: Order,
        epoch: impl Into<String>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type,
            sequence: order.last_sequence,
            epoch: epoch.into(),
            previous_status,
            order,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn table_id(&self) -> &str {
        &self.order.table_id
    }

    /// True when either side of the transition satisfies `pred`
    pub fn touches(&self, pred: impl Fn(OrderStatus) -> bool) -> bool {
        pred(self.order.status) || self.previous_status.is_some_and(&pred)
    }
}

/// Staff roles with their own channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StaffRole {
    Kitchen,
    Waiter,
    Checkout,
    Admin,
}

/// Delivery scope of a subscription
///
/// Serialized as `{"role":"kitchen"}` or `{"table":"5"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    Role(StaffRole),
    Table(String),
}

impl Topic {
    pub fn table(table_id: impl Into<String>) -> Self {
        Topic::Table(table_id.into())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Role(role) => write!(f, "role:{:?}", role),
            Topic::Table(id) => write!(f, "table:{}", id),
        }
    }
}
