//! Synchronization API for reconnecting clients
//!
//! There is no event log to replay. A reconnecting client always gets the
//! full set of open orders, unless it proves it is already current.
//!
//! # Protocol
//!
//! 1. Client sends the epoch and sequence of its last reconcile
//! 2. Same epoch and same sequence: `upToDate`, no orders sent
//! 3. Otherwise: every non-terminal order plus the current sequence and epoch
//! 4. Client rebuilds its queue views, then applies live events again

use super::manager::{ManagerResult, OrdersManager};
use serde::{Deserialize, Serialize};
use shared::order::Order;

/// Sync request from client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Client's last known sequence number
    #[serde(default)]
    pub since_sequence: Option<u64>,
    /// Epoch the client last synced against
    #[serde(default)]
    pub epoch: Option<String>,
}

/// Sync response to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// Every non-terminal order (empty when `up_to_date`)
    pub orders: Vec<Order>,
    /// Server's current sequence number
    pub server_sequence: u64,
    /// Server instance epoch (UUID generated on startup)
    /// If it changed, the client must drop its views and rebuild
    pub server_epoch: String,
    /// Client was already current
    pub up_to_date: bool,
    /// How often followers should poll their queue between live events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
}

impl OrdersManager {
    /// Reconcile a reconnecting client
    pub fn sync(&self, request: &SyncRequest) -> ManagerResult<SyncResponse> {
        let same_epoch = request.epoch.as_deref() == Some(self.epoch());
        if same_epoch
            && let Some(since) = request.since_sequence
        {
            let current = self.current_sequence()?;
            if since == current {
                return Ok(SyncResponse {
                    orders: vec![],
                    server_sequence: current,
                    server_epoch: self.epoch().to_string(),
                    up_to_date: true,
                    poll_interval_secs: None,
                });
            }
        }

        let (mut orders, server_sequence) = self.open_orders()?;
        shared::order::sort_queue(&mut orders);
        tracing::debug!(
            since = ?request.since_sequence,
            server_sequence,
            orders = orders.len(),
            "Full sync"
        );
        Ok(SyncResponse {
            orders,
            server_sequence,
            server_epoch: self.epoch().to_string(),
            up_to_date: false,
            poll_interval_secs: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::manager::ManagerConfig;
    use crate::orders::storage::OrderStorage;
    use rust_decimal::Decimal;
    use shared::order::{CreateOrderInput, OrderItemInput};

    fn create_test_manager() -> OrdersManager {
        OrdersManager::with_storage(OrderStorage::open_in_memory().unwrap(), ManagerConfig::default())
    }

    fn create(manager: &OrdersManager) -> Order {
        manager
            .create_order(CreateOrderInput {
                table_id: "8".into(),
                items: vec![OrderItemInput::priced("tea", Decimal::from(2), 1)],
            })
            .unwrap()
            .order
    }

    #[test]
    fn test_first_sync_is_full() {
        let manager = create_test_manager();
        create(&manager);
        create(&manager);

        let response = manager.sync(&SyncRequest::default()).unwrap();
        assert!(!response.up_to_date);
        assert_eq!(response.orders.len(), 2);
        assert_eq!(response.server_sequence, 2);
        assert_eq!(response.server_epoch, manager.epoch());
    }

    #[test]
    fn test_current_client_gets_up_to_date() {
        let manager = create_test_manager();
        create(&manager);
        let first = manager.sync(&SyncRequest::default()).unwrap();

        let request = SyncRequest {
            since_sequence: Some(first.server_sequence),
            epoch: Some(first.server_epoch.clone()),
        };
        let again = manager.sync(&request).unwrap();
        assert!(again.up_to_date);
        assert!(again.orders.is_empty());

        create(&manager);
        let behind = manager.sync(&request).unwrap();
        assert!(!behind.up_to_date);
        assert_eq!(behind.orders.len(), 2);
    }

    #[test]
    fn test_foreign_epoch_forces_full_sync() {
        let manager = create_test_manager();
        create(&manager);
        let response = manager
            .sync(&SyncRequest {
                since_sequence: Some(1),
                epoch: Some("previous-run".into()),
            })
            .unwrap();
        assert!(!response.up_to_date);
        assert_eq!(response.orders.len(), 1);
    }
}
