//! OrdersManager - the only writer of order state
//!
//! This module handles:
//! - Order creation (validation, price snapshot, order number)
//! - Status transitions as conditional updates against redb
//! - Event broadcasting after each committed write
//!
//! # Transition Flow
//!
//! ```text
//! kitchen_complete(order_id)
//!     ├─ 1. Begin write transaction
//!     ├─ 2. Load committed order
//!     ├─ 3. Transition::decide (expected prior status?)
//!     │      ├─ no  → Conflict (nothing written)
//!     │      └─ yes → bump version + change sequence, persist
//!     ├─ 4. Commit transaction
//!     ├─ 5. Broadcast OrderEvent (full post-write order)
//!     └─ 6. Return the new order
//! ```

mod error;
pub use error::*;

use super::machine::Transition;
use super::sequence::{CounterStore, IssuedNumber, SequenceGenerator, SequencePolicy};
use super::storage::{OrderStorage, StorageError, UpdateOutcome};
use crate::core::Config;
use crate::services::Catalog;
use crate::utils::time::now_millis;
use chrono::Utc;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use shared::message::{NotificationCategory, NotificationPayload};
use shared::order::{
    CreateOrderInput, CreatedOrder, Order, OrderEvent, OrderEventType, OrderItem, OrderStatus,
    PaymentMethod,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Insert attempts when an issued number turns out to be taken
const MAX_NUMBER_ATTEMPTS: usize = 3;

/// Highest accepted unit price
const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Highest accepted quantity per line
const MAX_QUANTITY: u32 = 9999;

/// Alert channel capacity (operator notifications are rare)
const ALERT_CHANNEL_CAPACITY: usize = 64;

/// Manager settings derived from [`Config`]
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub timezone: Tz,
    pub sequence: SequencePolicy,
    pub event_channel_capacity: usize,
}

impl ManagerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timezone: config.timezone,
            sequence: SequencePolicy {
                retry_attempts: config.sequence_retry_attempts,
                retry_base: Duration::from_millis(config.sequence_retry_base_ms),
                allow_degraded: config.allow_degraded_order_numbers,
            },
            event_channel_capacity: config.event_channel_capacity.max(1),
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Madrid,
            sequence: SequencePolicy::default(),
            event_channel_capacity: 1024,
        }
    }
}

/// Result of a settle call
#[derive(Debug, Clone)]
pub struct SettleOutcome {
    pub order: Order,
    /// The order was already paid; nothing was written
    pub already_paid: bool,
}

/// OrdersManager for order creation and transitions
///
/// The `epoch` field is a unique identifier generated on each startup.
/// Clients use it to detect server restarts and trigger a full reconcile.
pub struct OrdersManager {
    storage: OrderStorage,
    sequence: SequenceGenerator<Arc<dyn CounterStore>>,
    catalog: Option<Arc<dyn Catalog>>,
    event_tx: broadcast::Sender<OrderEvent>,
    alert_tx: broadcast::Sender<NotificationPayload>,
    /// Server instance epoch - unique ID generated on startup
    epoch: String,
    tz: Tz,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &"<OrderStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("epoch", &self.epoch)
            .field("tz", &self.tz)
            .finish()
    }
}

impl OrdersManager {
    /// Create a new OrdersManager with the given database path
    pub fn new(db_path: impl AsRef<Path>, config: ManagerConfig) -> ManagerResult<Self> {
        let storage = OrderStorage::open(db_path)?;
        Ok(Self::with_storage(storage, config))
    }

    /// Create an OrdersManager over existing storage
    pub fn with_storage(storage: OrderStorage, config: ManagerConfig) -> Self {
        let counter: Arc<dyn CounterStore> = Arc::new(storage.clone());
        Self::with_counter(storage, counter, config)
    }

    /// Create an OrdersManager whose order numbers come from `counter`
    pub fn with_counter(
        storage: OrderStorage,
        counter: Arc<dyn CounterStore>,
        config: ManagerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        let (alert_tx, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "OrdersManager started with new epoch");
        Self {
            storage,
            sequence: SequenceGenerator::new(counter, config.sequence, config.timezone),
            catalog: None,
            event_tx,
            alert_tx,
            epoch,
            tz: config.timezone,
        }
    }

    /// Set the catalog used to price new orders
    pub fn set_catalog(&mut self, catalog: Arc<dyn Catalog>) {
        self.catalog = Some(catalog);
    }

    /// Subscribe to committed order events
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.event_tx.subscribe()
    }

    /// Subscribe to operator alerts (degraded order numbers)
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<NotificationPayload> {
        self.alert_tx.subscribe()
    }

    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    // ========== Queries ==========

    pub fn get_order(&self, order_id: &str) -> ManagerResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| ManagerError::NotFound(order_id.to_string()))
    }

    /// Non-terminal orders and the change sequence they reflect
    pub fn open_orders(&self) -> ManagerResult<(Vec<Order>, u64)> {
        Ok(self.storage.open_orders_snapshot()?)
    }

    pub fn current_sequence(&self) -> ManagerResult<u64> {
        Ok(self.storage.current_sequence()?)
    }

    // ========== Creation ==========

    /// Create an order in `pending`
    pub fn create_order(&self, input: CreateOrderInput) -> ManagerResult<CreatedOrder> {
        let table_id = input.table_id.trim().to_string();
        let items = self.price_items(&table_id, input)?;

        let now = Utc::now();
        let mut order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            order_number: String::new(),
            table_id,
            items,
            status: OrderStatus::Pending,
            paid: false,
            created_at: now.timestamp_millis(),
            processed_at: None,
            paid_at: None,
            payment_method: None,
            version: 0,
            last_sequence: 0,
            degraded_number: false,
        };

        let mut attempt = 0;
        let stored = loop {
            attempt += 1;
            let IssuedNumber { number, degraded } = self.sequence.next_for(now)?;
            order.order_number = number;
            order.degraded_number = degraded;

            match self.storage.insert_order(&order) {
                Ok(stored) => break stored,
                Err(StorageError::DuplicateOrderNumber(n)) if attempt < MAX_NUMBER_ATTEMPTS => {
                    tracing::warn!(order_number = %n, attempt, "Order number already taken, reissuing");
                }
                Err(e) => return Err(e.into()),
            }
        };

        let mut warnings = Vec::new();
        if stored.degraded_number {
            let message = format!(
                "Order {} for table {} got fallback number {}; uniqueness is not guaranteed",
                stored.id, stored.table_id, stored.order_number
            );
            tracing::error!(
                target: "operator",
                order_id = %stored.id,
                order_number = %stored.order_number,
                table_id = %stored.table_id,
                "Order created with degraded order number"
            );
            let alert = NotificationPayload::warning("Degraded order number", message.clone())
                .with_category(NotificationCategory::System)
                .with_data(serde_json::json!({
                    "orderId": stored.id,
                    "orderNumber": stored.order_number,
                    "tableId": stored.table_id,
                }));
            let _ = self.alert_tx.send(alert);
            warnings.push(message);
        }

        tracing::info!(
            order_id = %stored.id,
            order_number = %stored.order_number,
            table_id = %stored.table_id,
            items = stored.items.len(),
            "Order created"
        );
        self.emit(OrderEventType::Created, None, stored.clone());

        Ok(CreatedOrder {
            order: stored,
            warnings,
        })
    }

    /// Validate the requested lines and snapshot their prices
    fn price_items(&self, table_id: &str, input: CreateOrderInput) -> ManagerResult<Vec<OrderItem>> {
        if table_id.is_empty() {
            return Err(ManagerError::Validation("tableId is required".into()));
        }
        if input.items.is_empty() {
            return Err(ManagerError::Validation("items must not be empty".into()));
        }

        input
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let name = item.name.trim().to_string();
                if name.is_empty() {
                    return Err(ManagerError::Validation(format!(
                        "items[{}].name is required",
                        index
                    )));
                }
                if item.quantity == 0 {
                    return Err(ManagerError::Validation(format!(
                        "items[{}].quantity must be at least 1",
                        index
                    )));
                }
                if item.quantity > MAX_QUANTITY {
                    return Err(ManagerError::Validation(format!(
                        "items[{}].quantity exceeds maximum allowed ({}), got {}",
                        index, MAX_QUANTITY, item.quantity
                    )));
                }
                let catalog_price = self.catalog.as_ref().and_then(|c| c.unit_price(&name));
                let unit_price = catalog_price.or(item.unit_price).ok_or_else(|| {
                    ManagerError::Validation(format!("items[{}] ({}) has no price", index, name))
                })?;
                if unit_price < Decimal::ZERO {
                    return Err(ManagerError::Validation(format!(
                        "items[{}].unitPrice must not be negative",
                        index
                    )));
                }
                if unit_price > MAX_UNIT_PRICE {
                    return Err(ManagerError::Validation(format!(
                        "items[{}].unitPrice exceeds maximum allowed ({}), got {}",
                        index, MAX_UNIT_PRICE, unit_price
                    )));
                }
                Ok(OrderItem::new(name, unit_price, item.quantity))
            })
            .collect()
    }

    // ========== Transitions ==========

    /// `pending -> preparing`
    pub fn start_preparing(&self, order_id: &str) -> ManagerResult<Order> {
        self.transition(order_id, Transition::StartPreparing)
            .map(|(order, _)| order)
    }

    /// `pending | preparing -> readyForWaiter`, stamps `processedAt`
    pub fn kitchen_complete(&self, order_id: &str) -> ManagerResult<Order> {
        self.transition(order_id, Transition::KitchenComplete)
            .map(|(order, _)| order)
    }

    /// `readyForWaiter -> readyForCheckout`
    pub fn deliver_to_table(&self, order_id: &str) -> ManagerResult<Order> {
        self.transition(order_id, Transition::DeliverToTable)
            .map(|(order, _)| order)
    }

    /// `readyForCheckout -> paid`; a no-op success on an already-paid order
    pub fn settle(&self, order_id: &str, method: PaymentMethod) -> ManagerResult<SettleOutcome> {
        let (order, applied) = self.transition(order_id, Transition::Settle(method))?;
        Ok(SettleOutcome {
            order,
            already_paid: !applied,
        })
    }

    /// `readyForCheckout -> declined` (terminal)
    pub fn decline(&self, order_id: &str) -> ManagerResult<Order> {
        self.transition(order_id, Transition::Decline)
            .map(|(order, _)| order)
    }

    fn transition(&self, order_id: &str, transition: Transition) -> ManagerResult<(Order, bool)> {
        let now = now_millis();
        match self
            .storage
            .update_if(order_id, |order| transition.decide(order, now))?
        {
            UpdateOutcome::Written { previous, current } => {
                tracing::info!(
                    order_id = %current.id,
                    order_number = %current.order_number,
                    table_id = %current.table_id,
                    from = %previous.status,
                    to = %current.status,
                    "Order {}",
                    transition.name()
                );
                self.emit(
                    transition.event_type(),
                    Some(previous.status),
                    current.clone(),
                );
                Ok((current, true))
            }
            UpdateOutcome::Kept(order) => {
                tracing::debug!(order_id = %order.id, "{} already applied", transition.name());
                Ok((order, false))
            }
            UpdateOutcome::Rejected(order) => {
                tracing::debug!(
                    order_id = %order.id,
                    status = %order.status,
                    "{} rejected",
                    transition.name()
                );
                Err(ManagerError::Conflict {
                    order_id: order.id,
                    transition: transition.name(),
                    expected: transition.expected_from().to_vec(),
                    actual: order.status,
                })
            }
        }
    }

    /// Broadcast after commit; no receivers is fine
    fn emit(&self, event_type: OrderEventType, previous: Option<OrderStatus>, order: Order) {
        let event = OrderEvent::new(event_type, previous, order, self.epoch.clone());
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests;
