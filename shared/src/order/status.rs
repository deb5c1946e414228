//! Order status and the directed transition graph

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an order
///
/// ```text
/// pending ─▶ preparing ─▶ readyForWaiter ─▶ readyForCheckout ─▶ paid
///    │                         ▲                   │
///    └─────────────────────────┘                   └──────────▶ declined
/// ```
///
/// `sent` is accepted on input and folded into `readyForCheckout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    ReadyForWaiter,
    #[serde(alias = "sent")]
    ReadyForCheckout,
    Declined,
    Paid,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::ReadyForWaiter,
        OrderStatus::ReadyForCheckout,
        OrderStatus::Declined,
        OrderStatus::Paid,
    ];

    /// Statuses reachable in one step
    pub fn next(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Preparing, OrderStatus::ReadyForWaiter],
            OrderStatus::Preparing => &[OrderStatus::ReadyForWaiter],
            OrderStatus::ReadyForWaiter => &[OrderStatus::ReadyForCheckout],
            OrderStatus::ReadyForCheckout => &[OrderStatus::Paid, OrderStatus::Declined],
            OrderStatus::Declined | OrderStatus::Paid => &[],
        }
    }

    /// Whether `to` is a single edge away
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        self.next().contains(&to)
    }

    /// No further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Declined)
    }

    /// Still in the kitchen's hands
    pub fn is_kitchen_stage(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Preparing)
    }

    /// Delivered and waiting to be paid
    pub fn awaits_payment(&self) -> bool {
        matches!(self, OrderStatus::ReadyForCheckout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::ReadyForWaiter => "readyForWaiter",
            OrderStatus::ReadyForCheckout => "readyForCheckout",
            OrderStatus::Declined => "declined",
            OrderStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sent_alias_collapses_to_ready_for_checkout() {
        let status: OrderStatus = serde_json::from_str("\"sent\"").unwrap();
        assert_eq!(status, OrderStatus::ReadyForCheckout);
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            "\"readyForCheckout\""
        );
    }

    #[test]
    fn test_graph_has_no_cycles() {
        // Every path from any status terminates within |ALL| steps
        fn depth(s: OrderStatus, limit: usize) -> usize {
            assert!(limit > 0, "cycle through {}", s);
            s.next().iter().map(|n| 1 + depth(*n, limit - 1)).max().unwrap_or(0)
        }
        for s in OrderStatus::ALL {
            assert!(depth(s, OrderStatus::ALL.len() + 1) <= OrderStatus::ALL.len());
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for s in OrderStatus::ALL {
            assert_eq!(s.is_terminal(), s.next().is_empty(), "{}", s);
        }
    }

    #[test]
    fn test_no_backward_edges() {
        assert!(!OrderStatus::ReadyForWaiter.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::ReadyForCheckout));
        assert!(!OrderStatus::Declined.can_transition_to(OrderStatus::ReadyForCheckout));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::ReadyForWaiter));
    }
}
