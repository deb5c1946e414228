//! Event Router - manager broadcast to bus topics
//!
//! Decouples `OrdersManager` from delivery. The manager emits into an
//! in-process broadcast after each commit; the router fans each event out
//! to the topics it concerns.
//!
//! ```text
//! OrdersManager ──(events)──┐
//!                           ├──▶ EventRouter ──▶ EventBus topics
//! OrdersManager ──(alerts)──┘
//! ```
//!
//! If the router itself falls behind the manager, the skipped events are
//! gone; every topic gets a `Sync` frame so subscribers refetch.

use std::sync::Arc;

use shared::message::{BusMessage, NotificationPayload, SyncPayload};
use shared::order::{OrderEvent, StaffRole, Topic};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::message::EventBus;

/// Forwards order events and operator alerts onto the bus
pub struct EventRouter {
    bus: Arc<EventBus>,
}

impl EventRouter {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// Run until shutdown or both sources close
    pub async fn run(
        self,
        mut events: broadcast::Receiver<OrderEvent>,
        mut alerts: broadcast::Receiver<NotificationPayload>,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Event router started");
        let mut alerts_open = true;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Event router shutting down");
                    break;
                }
                result = events.recv() => match result {
                    Ok(event) => {
                        self.bus.publish_order_event(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::error!(skipped = n, "Event router lagged, asking every subscriber to resync");
                        self.bus.broadcast_all(BusMessage::sync(&SyncPayload::lagged(n)));
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Source channel closed, event router stopping");
                        break;
                    }
                },
                result = alerts.recv(), if alerts_open => match result {
                    Ok(alert) => {
                        self.bus.notify(&Topic::Role(StaffRole::Admin), &alert);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Operator alerts dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        alerts_open = false;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::manager::ManagerConfig;
    use crate::orders::storage::OrderStorage;
    use crate::orders::OrdersManager;
    use rust_decimal::Decimal;
    use shared::message::EventType;
    use shared::order::{CreateOrderInput, OrderItemInput};
    use std::time::Duration;

    fn create_test_manager() -> Arc<OrdersManager> {
        Arc::new(OrdersManager::with_storage(
            OrderStorage::open_in_memory().unwrap(),
            ManagerConfig::default(),
        ))
    }

    async fn recv(rx: &mut broadcast::Receiver<BusMessage>) -> BusMessage {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no frame within 2s")
            .unwrap()
    }

    #[tokio::test]
    async fn test_committed_events_reach_topics() {
        let manager = create_test_manager();
        let bus = Arc::new(EventBus::new());
        let mut kitchen = bus.subscribe(&Topic::Role(StaffRole::Kitchen));
        let mut table = bus.subscribe(&Topic::table("12"));
        let shutdown = CancellationToken::new();

        let router = EventRouter::new(bus.clone());
        let handle = tokio::spawn(router.run(
            manager.subscribe(),
            manager.subscribe_alerts(),
            shutdown.clone(),
        ));

        let created = manager
            .create_order(CreateOrderInput {
                table_id: "12".into(),
                items: vec![OrderItemInput::priced("salad", Decimal::from(6), 1)],
            })
            .unwrap();

        for rx in [&mut kitchen, &mut table] {
            let msg = recv(rx).await;
            assert_eq!(msg.event_type, EventType::OrderEvent);
            let event: OrderEvent = msg.parse_payload().unwrap();
            assert_eq!(event.order.id, created.order.id);
        }

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_lag_broadcasts_resync() {
        let bus = Arc::new(EventBus::new());
        let mut waiter = bus.subscribe(&Topic::Role(StaffRole::Waiter));
        let (events_tx, events_rx) = broadcast::channel::<OrderEvent>(1);
        let (_alerts_tx, alerts_rx) = broadcast::channel::<NotificationPayload>(1);

        // Overflow the router's source before it starts reading
        let manager = create_test_manager();
        let mut source = manager.subscribe();
        for table in ["1", "2", "3"] {
            manager
                .create_order(CreateOrderInput {
                    table_id: table.into(),
                    items: vec![OrderItemInput::priced("tea", Decimal::from(2), 1)],
                })
                .unwrap();
        }
        while let Ok(event) = source.try_recv() {
            let _ = events_tx.send(event);
        }

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(EventRouter::new(bus.clone()).run(
            events_rx,
            alerts_rx,
            shutdown.clone(),
        ));

        let msg = recv(&mut waiter).await;
        assert_eq!(msg.event_type, EventType::Sync);
        let payload: SyncPayload = msg.parse_payload().unwrap();
        assert_eq!(payload, SyncPayload::lagged(2));

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_alerts_go_to_admin() {
        let bus = Arc::new(EventBus::new());
        let mut admin = bus.subscribe(&Topic::Role(StaffRole::Admin));
        let (_events_tx, events_rx) = broadcast::channel::<OrderEvent>(4);
        let (alerts_tx, alerts_rx) = broadcast::channel(4);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(EventRouter::new(bus.clone()).run(
            events_rx,
            alerts_rx,
            shutdown.clone(),
        ));

        alerts_tx
            .send(NotificationPayload::warning("Order numbers degraded", "counter down"))
            .unwrap();
        let msg = recv(&mut admin).await;
        assert_eq!(msg.event_type, EventType::Notification);
        let payload: NotificationPayload = msg.parse_payload().unwrap();
        assert_eq!(payload.title, "Order numbers degraded");

        shutdown.cancel();
        handle.await.unwrap();
    }
}
