//! Tests del contador de secuencia: unicidad bajo concurrencia y formato.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use crm_core::{format_order_number, InMemorySequenceStore, SequenceStore};

#[test]
fn fifty_concurrent_allocations_never_repeat_a_value() {
    let store = Arc::new(InMemorySequenceStore::new());

    let handles: Vec<_> = (0..50).map(|_| {
                                     let store = Arc::clone(&store);
                                     thread::spawn(move || store.next("order-number").unwrap())
                                 })
                                 .collect();

    let values: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let unique: HashSet<i64> = values.iter().copied().collect();

    assert_eq!(unique.len(), 50);
    assert_eq!(values.iter().min().copied(), Some(1));
    assert_eq!(values.iter().max().copied(), Some(50));
}

#[test]
fn counters_are_independent_per_id() {
    let store = InMemorySequenceStore::new();

    assert_eq!(store.next("order-number").unwrap(), 1);
    assert_eq!(store.next("order-number").unwrap(), 2);
    assert_eq!(store.next("delivery-note").unwrap(), 1);
}

#[test]
fn default_store_counts_from_one_like_new() {
    let store = InMemorySequenceStore::default();

    assert_eq!(store.next("order-number").unwrap(), 1);
}

#[test]
fn seeded_counter_starts_where_told() {
    let store = InMemorySequenceStore::with_start(100);

    assert_eq!(store.next("order-number").unwrap(), 100);
    assert_eq!(store.next("order-number").unwrap(), 101);
}

#[test]
fn order_numbers_are_zero_padded() {
    assert_eq!(format_order_number("K-", 2025, 1), "K-2025-0001");
    assert_eq!(format_order_number("K-", 2025, 42), "K-2025-0042");
    assert_eq!(format_order_number("R-", 2026, 12345), "R-2026-12345");
}
