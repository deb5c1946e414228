//! Role-scoped queue queries
//!
//! Membership comes only from each order's `status` and `paid` fields, as
//! decided by [`QueueKind::admits`]. Nothing here remembers which orders a
//! client has already handled.

use super::manager::{ManagerResult, OrdersManager};
use shared::order::{Order, QueueKind, QueueSnapshot};

impl OrdersManager {
    /// Authoritative queue contents with the sequence and epoch they reflect
    pub fn queue_snapshot(&self, kind: &QueueKind) -> ManagerResult<QueueSnapshot> {
        let (open, server_sequence) = self.open_orders()?;
        Ok(QueueSnapshot {
            orders: kind.select(open),
            server_sequence,
            server_epoch: self.epoch().to_string(),
        })
    }

    /// Queue contents, oldest first
    pub fn list_queue(&self, kind: &QueueKind) -> ManagerResult<Vec<Order>> {
        Ok(self.queue_snapshot(kind)?.orders)
    }

    /// Payment-ready orders, optionally for one table, oldest first
    pub fn payment_ready_orders(&self, table_id: Option<&str>) -> ManagerResult<Vec<Order>> {
        let mut orders = self.list_queue(&QueueKind::Checkout)?;
        if let Some(table_id) = table_id {
            orders.retain(|o| o.table_id == table_id);
        }
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::manager::ManagerConfig;
    use crate::orders::storage::OrderStorage;
    use rust_decimal::Decimal;
    use shared::order::{CreateOrderInput, OrderItemInput, OrderStatus, PaymentMethod};

    fn create_test_manager() -> OrdersManager {
        OrdersManager::with_storage(OrderStorage::open_in_memory().unwrap(), ManagerConfig::default())
    }

    fn create(manager: &OrdersManager, table_id: &str) -> Order {
        manager
            .create_order(CreateOrderInput {
                table_id: table_id.into(),
                items: vec![OrderItemInput::priced("soup", Decimal::from(4), 1)],
            })
            .unwrap()
            .order
    }

    #[test]
    fn test_role_queues_partition_by_status() {
        let manager = create_test_manager();
        let pending = create(&manager, "1");
        let preparing = create(&manager, "1");
        manager.start_preparing(&preparing.id).unwrap();
        let ready = create(&manager, "2");
        manager.kitchen_complete(&ready.id).unwrap();
        let delivered = create(&manager, "2");
        manager.kitchen_complete(&delivered.id).unwrap();
        manager.deliver_to_table(&delivered.id).unwrap();

        let ids = |kind: QueueKind| -> Vec<String> {
            manager
                .list_queue(&kind)
                .unwrap()
                .into_iter()
                .map(|o| o.id)
                .collect()
        };

        assert_eq!(
            ids(QueueKind::Kitchen {
                include_preparing: false
            }),
            vec![pending.id.clone()]
        );
        assert_eq!(
            ids(QueueKind::Kitchen {
                include_preparing: true
            }),
            vec![pending.id.clone(), preparing.id.clone()]
        );
        assert_eq!(ids(QueueKind::Waiter), vec![ready.id.clone()]);
        assert_eq!(ids(QueueKind::Checkout), vec![delivered.id.clone()]);
        assert_eq!(
            ids(QueueKind::Customer {
                table_id: "2".into()
            }),
            vec![ready.id, delivered.id]
        );
    }

    #[test]
    fn test_snapshot_carries_sequence_and_epoch() {
        let manager = create_test_manager();
        let order = create(&manager, "3");
        manager.kitchen_complete(&order.id).unwrap();
        manager.deliver_to_table(&order.id).unwrap();

        let snapshot = manager.queue_snapshot(&QueueKind::Checkout).unwrap();
        assert_eq!(snapshot.server_sequence, 3);
        assert_eq!(snapshot.server_epoch, manager.epoch());
        assert_eq!(snapshot.orders.len(), 1);

        manager.settle(&order.id, PaymentMethod::Qr).unwrap();
        let after = manager.queue_snapshot(&QueueKind::Checkout).unwrap();
        assert!(after.orders.is_empty());
        assert_eq!(after.server_sequence, 4);
        assert!(manager.payment_ready_orders(Some("3")).unwrap().is_empty());

        let customer = manager
            .list_queue(&QueueKind::Customer {
                table_id: "3".into(),
            })
            .unwrap();
        assert!(customer.iter().all(|o| o.status != OrderStatus::Paid));
        assert!(customer.is_empty());
    }
}
