use super::*;
use crate::services::CatalogService;
use shared::order::{OrderItemInput, QueueKind};
use std::sync::atomic::{AtomicU32, Ordering};

mod test_concurrency;
mod test_flows;

fn create_test_manager() -> OrdersManager {
    let storage = OrderStorage::open_in_memory().unwrap();
    OrdersManager::with_storage(storage, ManagerConfig::default())
}

fn burger_order(table_id: &str) -> CreateOrderInput {
    CreateOrderInput {
        table_id: table_id.to_string(),
        items: vec![OrderItemInput::priced("burger", Decimal::from(10), 2)],
    }
}

/// Create an order and walk it to `status`
fn order_in(manager: &OrdersManager, table_id: &str, status: OrderStatus) -> Order {
    let mut order = manager.create_order(burger_order(table_id)).unwrap().order;
    let path = [
        (OrderStatus::Preparing, Transition::StartPreparing),
        (OrderStatus::ReadyForWaiter, Transition::KitchenComplete),
        (OrderStatus::ReadyForCheckout, Transition::DeliverToTable),
    ];
    for (reached, transition) in path {
        if order.status == status {
            break;
        }
        order = manager.transition(&order.id, transition).unwrap().0;
        assert_eq!(order.status, reached);
    }
    match status {
        OrderStatus::Paid => manager.settle(&order.id, PaymentMethod::Cash).unwrap().order,
        OrderStatus::Declined => manager.decline(&order.id).unwrap(),
        _ => order,
    }
}

/// Counter that is always down
struct BrokenCounter {
    calls: AtomicU32,
}

impl CounterStore for BrokenCounter {
    fn increment_day_counter(&self, _day: &str) -> Result<u64, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::OrderNotFound("counter".into()))
    }
}

fn degraded_config(allow_degraded: bool) -> ManagerConfig {
    ManagerConfig {
        sequence: SequencePolicy {
            retry_attempts: 2,
            retry_base: Duration::from_millis(1),
            allow_degraded,
        },
        ..ManagerConfig::default()
    }
}

// ========================================================================
// Creation
// ========================================================================

#[test]
fn test_create_order_assigns_number_and_pending() {
    let manager = create_test_manager();
    let created = manager.create_order(burger_order("5")).unwrap();
    let order = created.order;

    let today = crate::utils::time::day_key(crate::utils::time::business_day(
        Utc::now(),
        manager.timezone(),
    ));
    assert_eq!(order.order_number, format!("{}-001", today));
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(!order.paid);
    assert_eq!(order.version, 0);
    assert_eq!(order.subtotal(), Decimal::from(20));
    assert!(created.warnings.is_empty());
    assert_eq!(manager.get_order(&order.id).unwrap(), order);

    let second = manager.create_order(burger_order("6")).unwrap().order;
    assert_eq!(second.order_number, format!("{}-002", today));
}

#[test]
fn test_create_order_validation() {
    let manager = create_test_manager();

    let no_table = manager.create_order(burger_order("  "));
    assert!(matches!(no_table, Err(ManagerError::Validation(_))));

    let no_items = manager.create_order(CreateOrderInput {
        table_id: "5".into(),
        items: vec![],
    });
    assert!(matches!(no_items, Err(ManagerError::Validation(_))));

    let zero_qty = manager.create_order(CreateOrderInput {
        table_id: "5".into(),
        items: vec![OrderItemInput::priced("burger", Decimal::from(10), 0)],
    });
    assert!(matches!(zero_qty, Err(ManagerError::Validation(_))));

    let negative = manager.create_order(CreateOrderInput {
        table_id: "5".into(),
        items: vec![OrderItemInput::priced("burger", Decimal::from(-1), 1)],
    });
    assert!(matches!(negative, Err(ManagerError::Validation(_))));

    let unpriced = manager.create_order(CreateOrderInput {
        table_id: "5".into(),
        items: vec![OrderItemInput {
            name: "burger".into(),
            unit_price: None,
            quantity: 1,
        }],
    });
    assert!(matches!(unpriced, Err(ManagerError::Validation(_))));

    // Nothing was numbered
    assert_eq!(manager.current_sequence().unwrap(), 0);
}

#[test]
fn test_create_order_bounds_price_and_quantity() {
    let manager = create_test_manager();
    let line = |price: Decimal, quantity: u32| CreateOrderInput {
        table_id: "9".into(),
        items: vec![OrderItemInput::priced("caviar", price, quantity)],
    };

    let huge_price = manager.create_order(line(Decimal::from_i128_with_scale(10i128.pow(28), 0), 10));
    assert!(matches!(huge_price, Err(ManagerError::Validation(_))));

    let over_price = manager.create_order(line(MAX_UNIT_PRICE + Decimal::new(1, 2), 1));
    assert!(matches!(over_price, Err(ManagerError::Validation(_))));

    let over_qty = manager.create_order(line(Decimal::from(1), MAX_QUANTITY + 1));
    assert!(matches!(over_qty, Err(ManagerError::Validation(_))));
    assert_eq!(manager.current_sequence().unwrap(), 0);

    // The largest accepted line still totals without overflow
    let order = manager
        .create_order(line(MAX_UNIT_PRICE, MAX_QUANTITY))
        .unwrap()
        .order;
    assert_eq!(
        order.subtotal(),
        MAX_UNIT_PRICE * Decimal::from(MAX_QUANTITY)
    );
}

#[test]
fn test_catalog_price_snapshot() {
    let mut manager = create_test_manager();
    let catalog = Arc::new(CatalogService::with_prices([("burger", Decimal::from(12))]));
    manager.set_catalog(catalog.clone());

    let order = manager
        .create_order(CreateOrderInput {
            table_id: "5".into(),
            items: vec![
                // Client price is ignored when the catalog knows the item
                OrderItemInput::priced("burger", Decimal::from(1), 1),
                OrderItemInput {
                    name: "burger".into(),
                    unit_price: None,
                    quantity: 1,
                },
            ],
        })
        .unwrap()
        .order;
    assert!(order.items.iter().all(|i| i.unit_price == Decimal::from(12)));

    catalog.set_price("burger", Decimal::from(20));
    let stored = manager.get_order(&order.id).unwrap();
    assert_eq!(stored.subtotal(), Decimal::from(24));
}

#[test]
fn test_degraded_number_flags_and_alerts() {
    let storage = OrderStorage::open_in_memory().unwrap();
    let counter = Arc::new(BrokenCounter {
        calls: AtomicU32::new(0),
    });
    let manager = OrdersManager::with_counter(storage, counter.clone(), degraded_config(true));
    let mut alerts = manager.subscribe_alerts();

    let created = manager.create_order(burger_order("5")).unwrap();
    assert!(created.order.degraded_number);
    assert!(created.order.order_number.contains("-T"));
    assert_eq!(created.warnings.len(), 1);
    assert_eq!(counter.calls.load(Ordering::SeqCst), 2);

    let alert = alerts.try_recv().unwrap();
    assert_eq!(alert.category, NotificationCategory::System);
    assert_eq!(
        alert.data.unwrap()["orderNumber"],
        created.order.order_number.as_str()
    );
}

#[test]
fn test_sequence_unavailable_without_fallback() {
    let storage = OrderStorage::open_in_memory().unwrap();
    let counter = Arc::new(BrokenCounter {
        calls: AtomicU32::new(0),
    });
    let manager = OrdersManager::with_counter(storage, counter, degraded_config(false));

    let err = manager.create_order(burger_order("5")).unwrap_err();
    assert!(matches!(err, ManagerError::SequenceUnavailable(_)));
    let app: shared::error::AppError = err.into();
    assert_eq!(app.http_status(), http::StatusCode::SERVICE_UNAVAILABLE);
}

// ========================================================================
// Transitions
// ========================================================================

#[test]
fn test_kitchen_complete_from_pending_and_preparing() {
    let manager = create_test_manager();

    let a = order_in(&manager, "1", OrderStatus::Pending);
    let a = manager.kitchen_complete(&a.id).unwrap();
    assert_eq!(a.status, OrderStatus::ReadyForWaiter);
    assert!(a.processed_at.is_some());
    assert_eq!(a.version, 1);

    let b = order_in(&manager, "1", OrderStatus::Preparing);
    let b = manager.kitchen_complete(&b.id).unwrap();
    assert_eq!(b.status, OrderStatus::ReadyForWaiter);
    assert_eq!(b.version, 2);
}

#[test]
fn test_unexpected_status_is_conflict() {
    let manager = create_test_manager();
    let order = order_in(&manager, "1", OrderStatus::ReadyForWaiter);

    let err = manager.kitchen_complete(&order.id).unwrap_err();
    match err {
        ManagerError::Conflict {
            order_id,
            transition,
            actual,
            ..
        } => {
            assert_eq!(order_id, order.id);
            assert_eq!(transition, "kitchenComplete");
            assert_eq!(actual, OrderStatus::ReadyForWaiter);
        }
        other => panic!("expected conflict, got {:?}", other),
    }
    // Order unchanged
    assert_eq!(manager.get_order(&order.id).unwrap(), order);

    assert!(matches!(
        manager.settle(&order.id, PaymentMethod::Cash),
        Err(ManagerError::Conflict { .. })
    ));
}

#[test]
fn test_unknown_order_is_not_found() {
    let manager = create_test_manager();
    assert!(matches!(
        manager.kitchen_complete("missing"),
        Err(ManagerError::NotFound(id)) if id == "missing"
    ));
    assert!(matches!(
        manager.get_order("missing"),
        Err(ManagerError::NotFound(_))
    ));
}

#[test]
fn test_settle_is_idempotent() {
    let manager = create_test_manager();
    let order = order_in(&manager, "3", OrderStatus::ReadyForCheckout);

    let first = manager.settle(&order.id, PaymentMethod::Cash).unwrap();
    assert!(!first.already_paid);
    assert!(first.order.paid);
    assert_eq!(first.order.status, OrderStatus::Paid);
    assert_eq!(first.order.payment_method, Some(PaymentMethod::Cash));

    let second = manager.settle(&order.id, PaymentMethod::Card).unwrap();
    assert!(second.already_paid);
    assert_eq!(second.order, first.order);
}

#[test]
fn test_decline_is_terminal() {
    let manager = create_test_manager();
    let order = order_in(&manager, "3", OrderStatus::Declined);
    assert_eq!(order.status, OrderStatus::Declined);
    assert!(!order.paid);

    assert!(matches!(
        manager.settle(&order.id, PaymentMethod::Cash),
        Err(ManagerError::Conflict { .. })
    ));
    let (open, _) = manager.open_orders().unwrap();
    assert!(open.is_empty());
}

// ========================================================================
// Events
// ========================================================================

#[test]
fn test_events_follow_commits() {
    let manager = create_test_manager();
    let mut rx = manager.subscribe();

    let order = manager.create_order(burger_order("9")).unwrap().order;
    manager.kitchen_complete(&order.id).unwrap();
    manager.deliver_to_table(&order.id).unwrap();
    let order = manager.settle(&order.id, PaymentMethod::Cash).unwrap().order;

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.epoch, manager.epoch());
        assert_eq!(event.sequence, event.order.last_sequence);
        seen.push((event.event_type, event.previous_status, event.order.status));
    }
    assert_eq!(
        seen,
        vec![
            (OrderEventType::Created, None, OrderStatus::Pending),
            (
                OrderEventType::StatusChanged,
                Some(OrderStatus::Pending),
                OrderStatus::ReadyForWaiter
            ),
            (
                OrderEventType::StatusChanged,
                Some(OrderStatus::ReadyForWaiter),
                OrderStatus::ReadyForCheckout
            ),
            (
                OrderEventType::Paid,
                Some(OrderStatus::ReadyForCheckout),
                OrderStatus::Paid
            ),
        ]
    );
    assert!(order.paid);

    // Failed and no-op transitions emit nothing
    let _ = manager.kitchen_complete(&order.id);
    let _ = manager.settle(&order.id, PaymentMethod::Cash);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_paid_order_leaves_every_queue() {
    let manager = create_test_manager();
    let order = order_in(&manager, "5", OrderStatus::Paid);
    let (open, _) = manager.open_orders().unwrap();

    for kind in [
        QueueKind::Kitchen {
            include_preparing: true,
        },
        QueueKind::Waiter,
        QueueKind::Checkout,
        QueueKind::Customer {
            table_id: "5".into(),
        },
    ] {
        assert!(!kind.admits(&order));
        assert!(kind.select(open.clone()).is_empty());
    }
}
