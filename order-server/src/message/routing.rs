//! Event → topic routing

use shared::order::{OrderEvent, OrderEventType, OrderStatus, QueueKind, StaffRole, Topic};

/// Every topic that must see `event`
///
/// A role sees a transition when either side of it belongs to that role's
/// stage, so an order leaving a queue reaches the same subscribers that saw
/// it enter.
pub fn topics_for(event: &OrderEvent) -> Vec<Topic> {
    let mut topics = vec![
        Topic::table(event.table_id()),
        Topic::Role(StaffRole::Admin),
    ];

    if event.touches(|s| s.is_kitchen_stage()) {
        topics.push(Topic::Role(StaffRole::Kitchen));
    }
    if event.touches(|s| s == OrderStatus::ReadyForWaiter) {
        topics.push(Topic::Role(StaffRole::Waiter));
    }
    if event.touches(|s| s.awaits_payment())
        || matches!(
            event.event_type,
            OrderEventType::Paid | OrderEventType::Declined
        )
    {
        topics.push(Topic::Role(StaffRole::Checkout));
    }

    topics
}

/// Topic a follower of `kind` subscribes to
pub fn topic_for_queue(kind: &QueueKind) -> Topic {
    match kind {
        QueueKind::Kitchen { .. } => Topic::Role(StaffRole::Kitchen),
        QueueKind::Waiter => Topic::Role(StaffRole::Waiter),
        QueueKind::Checkout => Topic::Role(StaffRole::Checkout),
        QueueKind::Customer { table_id } => Topic::table(table_id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::order::{Order, OrderItem};

    fn event(
        event_type: OrderEventType,
        previous: Option<OrderStatus>,
        status: OrderStatus,
    ) -> OrderEvent {
        let order = Order {
            id: "o1".into(),
            order_number: "20261019-001".into(),
            table_id: "5".into(),
            items: vec![OrderItem::new("soup", Decimal::from(4), 1)],
            status,
            paid: status == OrderStatus::Paid,
            created_at: 0,
            processed_at: None,
            paid_at: None,
            payment_method: None,
            version: 0,
            last_sequence: 1,
            degraded_number: false,
        };
        OrderEvent::new(event_type, previous, order, "epoch")
    }

    fn roles(topics: &[Topic]) -> Vec<StaffRole> {
        topics
            .iter()
            .filter_map(|t| match t {
                Topic::Role(r) => Some(*r),
                Topic::Table(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_created_goes_to_kitchen_table_and_admin() {
        let topics = topics_for(&event(OrderEventType::Created, None, OrderStatus::Pending));
        assert!(topics.contains(&Topic::table("5")));
        assert_eq!(roles(&topics), vec![StaffRole::Admin, StaffRole::Kitchen]);
    }

    #[test]
    fn test_kitchen_complete_reaches_both_sides() {
        let topics = topics_for(&event(
            OrderEventType::StatusChanged,
            Some(OrderStatus::Preparing),
            OrderStatus::ReadyForWaiter,
        ));
        assert_eq!(
            roles(&topics),
            vec![StaffRole::Admin, StaffRole::Kitchen, StaffRole::Waiter]
        );
    }

    #[test]
    fn test_delivery_leaves_waiter_enters_checkout() {
        let topics = topics_for(&event(
            OrderEventType::StatusChanged,
            Some(OrderStatus::ReadyForWaiter),
            OrderStatus::ReadyForCheckout,
        ));
        assert_eq!(
            roles(&topics),
            vec![StaffRole::Admin, StaffRole::Waiter, StaffRole::Checkout]
        );
    }

    #[test]
    fn test_decline_from_kitchen_reaches_checkout() {
        let topics = topics_for(&event(
            OrderEventType::Declined,
            Some(OrderStatus::Pending),
            OrderStatus::Declined,
        ));
        assert_eq!(
            roles(&topics),
            vec![StaffRole::Admin, StaffRole::Kitchen, StaffRole::Checkout]
        );
    }

    #[test]
    fn test_queue_topic_receives_every_membership_change() {
        // Any event that changes a queue's membership reaches that queue's topic
        let kind = QueueKind::Waiter;
        let e = event(
            OrderEventType::StatusChanged,
            Some(OrderStatus::ReadyForWaiter),
            OrderStatus::ReadyForCheckout,
        );
        assert!(topics_for(&e).contains(&topic_for_queue(&kind)));
        assert_eq!(
            topic_for_queue(&QueueKind::Customer { table_id: "5".into() }),
            Topic::table("5")
        );
    }

    #[test]
    fn test_other_tables_are_not_addressed() {
        let topics = topics_for(&event(OrderEventType::Created, None, OrderStatus::Pending));
        assert!(!topics.contains(&Topic::table("6")));
    }
}
