use super::*;

/// Every status an order passes through is one edge of the graph
#[test]
fn test_observed_paths_follow_the_graph() {
    let manager = create_test_manager();
    let mut rx = manager.subscribe();

    let a = order_in(&manager, "1", OrderStatus::Paid);
    let b = order_in(&manager, "1", OrderStatus::Declined);
    let c = order_in(&manager, "2", OrderStatus::ReadyForWaiter);
    // Rejected attempts in between
    let _ = manager.deliver_to_table(&a.id);
    let _ = manager.kitchen_complete(&b.id);
    let _ = manager.decline(&c.id);

    let mut last: std::collections::HashMap<String, OrderStatus> = Default::default();
    while let Ok(event) = rx.try_recv() {
        match event.previous_status {
            None => assert_eq!(event.order.status, OrderStatus::Pending),
            Some(prev) => {
                assert_eq!(last.get(&event.order.id), Some(&prev));
                assert!(prev.can_transition_to(event.order.status));
            }
        }
        last.insert(event.order.id.clone(), event.order.status);
    }

    assert_eq!(last[&a.id], OrderStatus::Paid);
    assert_eq!(last[&b.id], OrderStatus::Declined);
    assert_eq!(last[&c.id], OrderStatus::ReadyForWaiter);
}

#[test]
fn test_open_orders_snapshot_sequence() {
    let manager = create_test_manager();
    let a = order_in(&manager, "1", OrderStatus::Pending);
    let b = order_in(&manager, "1", OrderStatus::ReadyForCheckout);
    let paid = order_in(&manager, "2", OrderStatus::Paid);

    let (open, seq) = manager.open_orders().unwrap();
    let ids: Vec<_> = open.iter().map(|o| o.id.as_str()).collect();
    assert!(ids.contains(&a.id.as_str()));
    assert!(ids.contains(&b.id.as_str()));
    assert!(!ids.contains(&paid.id.as_str()));
    assert_eq!(seq, manager.current_sequence().unwrap());
    assert!(open.iter().all(|o| o.last_sequence <= seq));
}
