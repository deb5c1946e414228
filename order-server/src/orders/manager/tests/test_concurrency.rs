use super::*;
use std::collections::HashSet;
use std::sync::Barrier;
use std::thread;

#[test]
fn test_racing_kitchen_complete_applies_once() {
    for _ in 0..20 {
        let manager = Arc::new(create_test_manager());
        let order = manager.create_order(burger_order("4")).unwrap().order;
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let manager = manager.clone();
                let barrier = barrier.clone();
                let id = order.id.clone();
                thread::spawn(move || {
                    barrier.wait();
                    manager.kitchen_complete(&id)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(ManagerError::Conflict { .. })))
            .count();
        assert_eq!((ok, conflicts), (1, 1));

        let stored = manager.get_order(&order.id).unwrap();
        assert_eq!(stored.status, OrderStatus::ReadyForWaiter);
        assert_eq!(stored.version, 1);
    }
}

#[test]
fn test_concurrent_creation_numbers_are_distinct() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;

    let manager = Arc::new(create_test_manager());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let manager = manager.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                (0..PER_THREAD)
                    .map(|_| {
                        manager
                            .create_order(burger_order(&t.to_string()))
                            .unwrap()
                            .order
                            .order_number
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut numbers: Vec<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let distinct: HashSet<_> = numbers.iter().cloned().collect();
    assert_eq!(distinct.len(), THREADS * PER_THREAD);

    // Dense 001..=200 within the day
    let mut seqs: Vec<u64> = numbers
        .drain(..)
        .map(|n| n.rsplit('-').next().unwrap().parse().unwrap())
        .collect();
    seqs.sort_unstable();
    assert_eq!(seqs, (1..=(THREADS * PER_THREAD) as u64).collect::<Vec<_>>());
}

#[test]
fn test_numbers_increase_in_creation_order() {
    let manager = create_test_manager();
    let mut last = String::new();
    for _ in 0..12 {
        let number = manager.create_order(burger_order("2")).unwrap().order.order_number;
        assert!(number > last, "{} not after {}", number, last);
        last = number;
    }
}
