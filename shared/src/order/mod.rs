//! Order domain types
//!
//! - [`Order`] and its items: the record the server owns
//! - [`OrderStatus`]: the directed, acyclic transition graph
//! - [`OrderEvent`] and [`Topic`]: change notifications and their scopes
//! - [`QueueView`]: the materialized role queue clients keep
//! - [`Bill`] DTOs for checkout

pub mod bill;
pub mod event;
pub mod queue;
pub mod status;
pub mod types;

// Re-exports
pub use bill::{Bill, BillQuote, FailedSettlement, SettleBillRequest, SettlementReceipt};
pub use event::{OrderEvent, OrderEventType, StaffRole, Topic};
pub use queue::{ApplyOutcome, QueueKind, QueueSnapshot, QueueView, sort_queue};
pub use status::OrderStatus;
pub use types::*;
