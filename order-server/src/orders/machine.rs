//! Order state machine
//!
//! Each [`Transition`] names the statuses it may start from and the status
//! it produces. [`Transition::decide`] runs inside the storage write
//! transaction, so the status it checks is the committed one.

use shared::order::{Order, OrderEventType, OrderStatus, PaymentMethod};

use super::storage::UpdateDecision;

/// A role action on one order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Kitchen picks the order up
    StartPreparing,
    /// Kitchen is done
    KitchenComplete,
    /// Waiter brought it to the table
    DeliverToTable,
    /// Checkout took payment
    Settle(PaymentMethod),
    /// Checkout refused payment
    Decline,
}

impl Transition {
    /// Statuses this transition may start from
    pub fn expected_from(&self) -> &'static [OrderStatus] {
        match self {
            Transition::StartPreparing => &[OrderStatus::Pending],
            Transition::KitchenComplete => &[OrderStatus::Pending, OrderStatus::Preparing],
            Transition::DeliverToTable => &[OrderStatus::ReadyForWaiter],
            Transition::Settle(_) | Transition::Decline => &[OrderStatus::ReadyForCheckout],
        }
    }

    pub fn target(&self) -> OrderStatus {
        match self {
            Transition::StartPreparing => OrderStatus::Preparing,
            Transition::KitchenComplete => OrderStatus::ReadyForWaiter,
            Transition::DeliverToTable => OrderStatus::ReadyForCheckout,
            Transition::Settle(_) => OrderStatus::Paid,
            Transition::Decline => OrderStatus::Declined,
        }
    }

    pub fn event_type(&self) -> OrderEventType {
        match self {
            Transition::Settle(_) => OrderEventType::Paid,
            Transition::Decline => OrderEventType::Declined,
            _ => OrderEventType::StatusChanged,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transition::StartPreparing => "startPreparing",
            Transition::KitchenComplete => "kitchenComplete",
            Transition::DeliverToTable => "deliverToTable",
            Transition::Settle(_) => "settle",
            Transition::Decline => "decline",
        }
    }

    /// Decide against the committed state of `order`
    ///
    /// Settling an order that is already paid is a no-op (`Keep`), so a
    /// retried settlement succeeds.
    pub fn decide(&self, order: &Order, now: i64) -> UpdateDecision {
        if matches!(self, Transition::Settle(_)) && order.paid {
            return UpdateDecision::Keep;
        }
        if order.paid || !self.expected_from().contains(&order.status) {
            return UpdateDecision::Reject;
        }

        let mut next = order.clone();
        next.status = self.target();
        match self {
            Transition::KitchenComplete => next.processed_at = Some(now),
            Transition::Settle(method) => {
                next.paid = true;
                next.paid_at = Some(now);
                next.payment_method = Some(*method);
            }
            _ => {}
        }
        UpdateDecision::Write(next)
    }
}
