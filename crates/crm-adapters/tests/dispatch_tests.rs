//! Tests del despacho idempotente de pedidos a proveedores.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crm_adapters::{dispatch_order, DispatchDeps, DispatchLogEntry, DispatchLogStore,
                   DispatchRequest, InMemoryDispatchLog, InMemoryGateway, InMemoryOrderStore,
                   OrderItem, OrderStore, SupplierOrder};

struct Harness {
    deps:    DispatchDeps,
    orders:  Arc<InMemoryOrderStore>,
    log:     Arc<InMemoryDispatchLog>,
    gateway: Arc<InMemoryGateway>,
}

fn harness() -> Harness {
    let orders = Arc::new(InMemoryOrderStore::new());
    let log = Arc::new(InMemoryDispatchLog::new());
    let gateway = Arc::new(InMemoryGateway::new());
    let deps = DispatchDeps { orders:  orders.clone(),
                              log:     log.clone(),
                              gateway: gateway.clone() };
    Harness { deps, orders, log, gateway }
}

fn sample_order() -> SupplierOrder {
    SupplierOrder { id:              Uuid::new_v4(),
                    order_number:    "K-2025-0007".into(),
                    supplier_name:   "Holz GmbH".into(),
                    supplier_email:  Some("bestellung@holz.example".into()),
                    status:          "draft".into(),
                    items:           vec![OrderItem { description: "Arbeitsplatte Eiche".into(),
                                                      quantity:    2 }],
                    sent_at:         None,
                    sent_to_email:   None,
                    idempotency_key: None }
}

fn keyed(key: &str) -> DispatchRequest {
    DispatchRequest { idempotency_key: Some(key.to_string()),
                      to_email:        None }
}

#[test]
fn same_key_twice_sends_once_and_replays_the_confirmation() {
    let h = harness();
    let order = sample_order();
    let id = order.id;
    h.orders.insert(order);

    let first = dispatch_order(&h.deps, id, &keyed("IK-001"));
    assert_eq!(first.status, 200);
    assert_eq!(first.body["alreadySent"], json!(false));
    let message_id = first.body["messageId"].clone();

    let second = dispatch_order(&h.deps, id, &keyed("IK-001"));
    assert_eq!(second.status, 200);
    assert_eq!(second.body["alreadySent"], json!(true));
    assert_eq!(second.body["messageId"], message_id);

    assert_eq!(h.gateway.sent_count(), 1);
    assert_eq!(h.log.len(), 1);
}

#[test]
fn different_keys_are_independent_dispatches() {
    let h = harness();
    let order = sample_order();
    let id = order.id;
    h.orders.insert(order);

    let first = dispatch_order(&h.deps, id, &keyed("IK-001"));
    let second = dispatch_order(&h.deps, id, &keyed("IK-002"));

    assert_eq!(first.body["alreadySent"], json!(false));
    assert_eq!(second.body["alreadySent"], json!(false));
    assert_eq!(h.gateway.sent_count(), 2);
    assert_eq!(h.log.len(), 2);
}

#[test]
fn without_key_an_already_sent_order_is_not_resent() {
    let h = harness();
    let mut order = sample_order();
    order.sent_at = Some(Utc::now());
    order.sent_to_email = Some("bestellung@holz.example".into());
    order.status = "sent".into();
    let id = order.id;
    h.orders.insert(order);

    let response = dispatch_order(&h.deps, id, &DispatchRequest::default());

    assert_eq!(response.status, 200);
    assert_eq!(response.body["alreadySent"], json!(true));
    assert_eq!(h.gateway.sent_count(), 0);
}

#[test]
fn unknown_order_is_not_found() {
    let h = harness();
    let response = dispatch_order(&h.deps, Uuid::new_v4(), &keyed("IK-404"));
    assert_eq!(response.status, 404);
}

#[test]
fn missing_recipient_is_a_client_error() {
    let h = harness();
    let mut order = sample_order();
    order.supplier_email = None;
    let id = order.id;
    h.orders.insert(order);

    let response = dispatch_order(&h.deps, id, &keyed("IK-001"));

    assert_eq!(response.status, 400);
    assert_eq!(h.gateway.sent_count(), 0);
}

#[test]
fn empty_order_is_a_client_error() {
    let h = harness();
    let mut order = sample_order();
    order.items.clear();
    let id = order.id;
    h.orders.insert(order);

    let response = dispatch_order(&h.deps, id, &keyed("IK-001"));

    assert_eq!(response.status, 400);
    assert_eq!(h.gateway.sent_count(), 0);
}

#[test]
fn explicit_recipient_overrides_supplier_email() {
    let h = harness();
    let order = sample_order();
    let id = order.id;
    h.orders.insert(order);

    let request = DispatchRequest { idempotency_key: Some("IK-001".into()),
                                    to_email:        Some("einkauf@kunde.example".into()) };
    let response = dispatch_order(&h.deps, id, &request);

    assert_eq!(response.body["sentTo"], json!("einkauf@kunde.example"));
    let sent = h.gateway.sent_messages();
    assert_eq!(sent[0].1.to, "einkauf@kunde.example");
}

#[test]
fn successful_dispatch_marks_the_order_sent() {
    let h = harness();
    let order = sample_order();
    let id = order.id;
    h.orders.insert(order);

    dispatch_order(&h.deps, id, &keyed("IK-001"));

    let stored = h.orders.get(id).unwrap().unwrap();
    assert_eq!(stored.status, "sent");
    assert!(stored.sent_at.is_some());
    assert_eq!(stored.idempotency_key.as_deref(), Some("IK-001"));
    assert_eq!(stored.sent_to_email.as_deref(), Some("bestellung@holz.example"));
}

#[test]
fn advanced_status_is_preserved_on_resend() {
    let h = harness();
    let mut order = sample_order();
    order.status = "ab_received".into();
    let id = order.id;
    h.orders.insert(order);

    dispatch_order(&h.deps, id, &keyed("IK-RESEND"));

    let stored = h.orders.get(id).unwrap().unwrap();
    // Un reenvío nunca retrocede un pedido que ya avanzó en el ciclo.
    assert_eq!(stored.status, "ab_received");
    assert!(stored.sent_at.is_some());
}

/// Log que siempre reporta violación de unicidad, simulando la carrera en la
/// que otro worker insertó primero.
struct RacingLog;

impl DispatchLogStore for RacingLog {
    fn find(&self, _order_id: Uuid, _key: &str) -> Result<Option<DispatchLogEntry>, crm_core::StoreError> {
        Ok(None)
    }

    fn insert(&self, _entry: &DispatchLogEntry) -> Result<(), crm_core::StoreError> {
        Err(crm_core::StoreError::UniqueViolation("dispatch log".into()))
    }
}

#[test]
fn unique_violation_on_log_insert_is_tolerated() {
    let orders = Arc::new(InMemoryOrderStore::new());
    let gateway = Arc::new(InMemoryGateway::new());
    let deps = DispatchDeps { orders:  orders.clone(),
                              log:     Arc::new(RacingLog),
                              gateway: gateway.clone() };
    let order = sample_order();
    let id = order.id;
    orders.insert(order);

    let response = dispatch_order(&deps, id, &keyed("IK-RACE"));

    // El envío ya ocurrió; la fila perdida en la carrera no falla el request.
    assert_eq!(response.status, 200);
    assert_eq!(response.body["alreadySent"], json!(false));
    assert_eq!(gateway.sent_count(), 1);
}
