//! Tests del guard de admisión: reserva atómica, replay y liberación.

use std::sync::Arc;
use std::thread;

use crm_core::{Admission, AdmissionError, AdmissionGuard, AdmissionStore, InMemoryAdmissionStore};
use serde_json::json;

fn guard_with_store() -> (AdmissionGuard, Arc<InMemoryAdmissionStore>) {
    let store = Arc::new(InMemoryAdmissionStore::new());
    (AdmissionGuard::new(store.clone()), store)
}

#[test]
fn first_reserve_wins_second_replays_the_stored_result() {
    let (guard, _store) = guard_with_store();

    let first = guard.reserve("x", "k1", json!({"n": 1})).unwrap();
    assert_eq!(first, Admission::Reserved);

    guard.complete("x", "k1", json!({"ok": true, "id": 7})).unwrap();

    let second = guard.reserve("x", "k1", json!({"n": 1})).unwrap();
    assert_eq!(second, Admission::Duplicate(Some(json!({"ok": true, "id": 7}))));
}

#[test]
fn duplicate_before_completion_reports_in_flight() {
    let (guard, _store) = guard_with_store();

    assert_eq!(guard.reserve("x", "k1", json!({})).unwrap(), Admission::Reserved);
    // El primer intento aún no escribió su resultado.
    assert_eq!(guard.reserve("x", "k1", json!({})).unwrap(), Admission::Duplicate(None));
}

#[test]
fn concurrent_reserves_yield_exactly_one_reservation() {
    let (guard, _store) = guard_with_store();
    let guard = Arc::new(guard);

    let handles: Vec<_> = (0..8).map(|_| {
                                    let guard = Arc::clone(&guard);
                                    thread::spawn(move || guard.reserve("x", "k1", json!({})).unwrap())
                                })
                                .collect();

    let outcomes: Vec<Admission> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let reserved = outcomes.iter().filter(|a| matches!(a, Admission::Reserved)).count();
    let duplicates = outcomes.iter()
                             .filter(|a| matches!(a, Admission::Duplicate(_)))
                             .count();

    assert_eq!(reserved, 1);
    assert_eq!(duplicates, 7);
}

#[test]
fn scopes_partition_the_key_space() {
    let (guard, _store) = guard_with_store();

    assert_eq!(guard.reserve("booking-webhook", "k1", json!({})).unwrap(), Admission::Reserved);
    // Misma clave literal, otra clase de trigger: no colisiona.
    assert_eq!(guard.reserve("supplier-order-dispatch", "k1", json!({})).unwrap(),
               Admission::Reserved);
}

#[test]
fn empty_key_is_rejected() {
    let (guard, _store) = guard_with_store();

    let err = guard.reserve("x", "  ", json!({})).unwrap_err();
    assert!(matches!(err, AdmissionError::EmptyKey));
}

#[test]
fn release_allows_readmission_after_a_failed_run() {
    let (guard, store) = guard_with_store();

    assert_eq!(guard.reserve("x", "k1", json!({})).unwrap(), Admission::Reserved);
    guard.release("x", "k1");
    assert_eq!(store.len(), 0);

    // La redelivery del proveedor vuelve a ser admitida.
    assert_eq!(guard.reserve("x", "k1", json!({})).unwrap(), Admission::Reserved);
}

#[test]
fn payload_snapshot_is_kept_for_audit() {
    let store = Arc::new(InMemoryAdmissionStore::new());
    let guard = AdmissionGuard::new(store.clone());

    guard.reserve("x", "k1", json!({"raw": "body"})).unwrap();

    let record = store.get("x", "k1").unwrap().unwrap();
    assert_eq!(record.payload_snapshot, json!({"raw": "body"}));
    assert_eq!(record.result_snapshot, None);
    assert_eq!(record.scope, "x");
    assert_eq!(record.key, "k1");
}
