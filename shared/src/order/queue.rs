//! Role queues
//!
//! [`QueueKind`] decides membership purely from an order's `status` and
//! `paid` fields. [`QueueView`] is the materialized copy a role client keeps:
//! it is rebuilt from a [`QueueSnapshot`] on (re)connect and on every poll,
//! and patched in between by live [`OrderEvent`]s.

use super::{Order, OrderEvent, OrderStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which role's queue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum QueueKind {
    Kitchen {
        #[serde(default)]
        include_preparing: bool,
    },
    Waiter,
    Checkout,
    /// One table's open orders
    Customer {
        table_id: String,
    },
}

impl QueueKind {
    /// Membership rule. Paid orders are never admitted.
    pub fn admits(&self, order: &Order) -> bool {
        if order.paid {
            return false;
        }
        match self {
            QueueKind::Kitchen { include_preparing } => {
                order.status == OrderStatus::Pending
                    || (*include_preparing && order.status == OrderStatus::Preparing)
            }
            QueueKind::Waiter => order.status == OrderStatus::ReadyForWaiter,
            QueueKind::Checkout => order.status.awaits_payment(),
            QueueKind::Customer { table_id } => {
                order.table_id == *table_id && !order.status.is_terminal()
            }
        }
    }

    /// Keep admitted orders, oldest first
    pub fn select(&self, orders: impl IntoIterator<Item = Order>) -> Vec<Order> {
        let mut selected: Vec<Order> = orders.into_iter().filter(|o| self.admits(o)).collect();
        sort_queue(&mut selected);
        selected
    }
}

/// Queue order: creation time, then order number
pub fn sort_queue(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.order_number.cmp(&b.order_number))
    });
}

/// Authoritative queue contents at a point in the change sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub orders: Vec<Order>,
    /// Every write with a sequence at or below this is reflected in `orders`
    pub server_sequence: u64,
    pub server_epoch: String,
}

/// What [`QueueView::apply`] did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Order entered the view or was refreshed in place
    Upserted,
    /// Order left the view
    Removed,
    /// Order is not part of this queue, before or after
    Unchanged,
    /// Duplicate, or older than what the view already reflects
    Stale,
    /// View has never been reconciled or the server restarted; fetch a snapshot
    NeedsReconcile,
}

/// Client-side materialized queue
#[derive(Debug, Clone)]
pub struct QueueView {
    kind: QueueKind,
    orders: HashMap<String, Order>,
    /// Latest `last_sequence` observed per order since the last reconcile.
    /// Only guards against reordering; membership never reads it.
    observed: HashMap<String, u64>,
    watermark: u64,
    epoch: Option<String>,
}

impl QueueView {
    pub fn new(kind: QueueKind) -> Self {
        Self {
            kind,
            orders: HashMap::new(),
            observed: HashMap::new(),
            watermark: 0,
            epoch: None,
        }
    }

    pub fn kind(&self) -> &QueueKind {
        &self.kind
    }

    /// Replace contents with a fresh snapshot
    pub fn reconcile(&mut self, snapshot: QueueSnapshot) {
        self.orders = snapshot
            .orders
            .into_iter()
            .filter(|o| self.kind.admits(o))
            .map(|o| (o.id.clone(), o))
            .collect();
        self.observed.clear();
        self.watermark = snapshot.server_sequence;
        self.epoch = Some(snapshot.server_epoch);
    }

    /// Patch the view with one live event
    pub fn apply(&mut self, event: &OrderEvent) -> ApplyOutcome {
        if self.epoch.as_deref() != Some(event.epoch.as_str()) {
            return ApplyOutcome::NeedsReconcile;
        }
        if event.sequence <= self.watermark {
            return ApplyOutcome::Stale;
        }

        let order = &event.order;
        if self
            .observed
            .get(&order.id)
            .is_some_and(|seen| *seen >= order.last_sequence)
        {
            return ApplyOutcome::Stale;
        }
        self.observed.insert(order.id.clone(), order.last_sequence);

        if self.kind.admits(order) {
            self.orders.insert(order.id.clone(), order.clone());
            ApplyOutcome::Upserted
        } else if self.orders.remove(&order.id).is_some() {
            ApplyOutcome::Removed
        } else {
            ApplyOutcome::Unchanged
        }
    }

    /// Current contents, oldest first
    pub fn list(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.values().cloned().collect();
        sort_queue(&mut orders);
        orders
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.orders.contains_key(order_id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    pub fn epoch(&self) -> Option<&str> {
        self.epoch.as_deref()
    }
}
