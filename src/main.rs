//! Demo end-to-end con stores en memoria: webhook de reserva (admisión
//! idempotente + workflow compensable) y despacho de pedido a proveedor.

use std::sync::Arc;

use serde_json::{json, to_string_pretty};
use uuid::Uuid;

use crm_adapters::{dispatch_order, handle_booking_webhook, BookingWebhookDeps, DispatchDeps,
                   DispatchRequest, Environment, InMemoryDirectory, InMemoryDispatchLog,
                   InMemoryGateway, InMemoryOrderStore, OrderItem, SupplierOrder, WebhookConfig};
use crm_core::{AdmissionGuard, InMemoryAdmissionStore, InMemorySequenceStore};

fn main() {
    // Cargar variables de entorno desde .env si existe
    crm_adapters::init_dotenv();

    let directory = Arc::new(InMemoryDirectory::new());
    let gateway = Arc::new(InMemoryGateway::new());
    let deps = BookingWebhookDeps { guard: AdmissionGuard::new(Arc::new(InMemoryAdmissionStore::new())),
                                    directory: directory.clone(),
                                    sequence: Arc::new(InMemorySequenceStore::new()),
                                    gateway: gateway.clone(),
                                    config: WebhookConfig::new(None, Environment::Development) };

    let body = json!({
        "triggerEvent": "BOOKING_CREATED",
        "payload": {
            "uid": "evt-42",
            "title": "Küchenplanung",
            "startTime": "2025-09-01T10:00:00Z",
            "endTime": "2025-09-01T11:00:00Z",
            "attendees": [{"name": "Erika Mustermann", "email": "erika@example.com"}],
            "metadata": {"videoCallUrl": "https://meet.example/abc"}
        }
    });
    let raw = serde_json::to_vec(&body).expect("body serializable");

    println!("== Webhook de reserva: primera entrega ==");
    let first = handle_booking_webhook(&deps, &raw, None);
    println!("status={} body={}", first.status,
             to_string_pretty(&first.body).unwrap_or_default());

    println!("\n== Webhook de reserva: redelivery del mismo evento ==");
    let second = handle_booking_webhook(&deps, &raw, None);
    println!("status={} body={}", second.status,
             to_string_pretty(&second.body).unwrap_or_default());
    println!("clientes={} proyectos={} emails={}",
             directory.customer_count(),
             directory.project_count(),
             gateway.sent_count());

    // Despacho de pedido con clave de idempotencia
    let orders = Arc::new(InMemoryOrderStore::new());
    let dispatch_deps = DispatchDeps { orders:  orders.clone(),
                                       log:     Arc::new(InMemoryDispatchLog::new()),
                                       gateway: gateway.clone() };
    let order_id = Uuid::new_v4();
    orders.insert(SupplierOrder { id:              order_id,
                                  order_number:    "K-2025-0001".into(),
                                  supplier_name:   "Holz GmbH".into(),
                                  supplier_email:  Some("bestellung@holz.example".into()),
                                  status:          "draft".into(),
                                  items:           vec![OrderItem { description: "Arbeitsplatte Eiche".into(),
                                                                    quantity:    2 }],
                                  sent_at:         None,
                                  sent_to_email:   None,
                                  idempotency_key: None });

    let request = DispatchRequest { idempotency_key: Some("IK-001".into()),
                                    to_email:        None };

    println!("\n== Despacho de pedido: primer intento ==");
    let sent = dispatch_order(&dispatch_deps, order_id, &request);
    println!("status={} body={}", sent.status,
             to_string_pretty(&sent.body).unwrap_or_default());

    println!("\n== Despacho de pedido: reintento con la misma clave ==");
    let replay = dispatch_order(&dispatch_deps, order_id, &request);
    println!("status={} body={}", replay.status,
             to_string_pretty(&replay.body).unwrap_or_default());
    println!("envíos totales por gateway={}", gateway.sent_count());
}
