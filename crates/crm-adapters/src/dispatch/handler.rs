//! Operación de despacho de un pedido a su proveedor.
//!
//! Contrato idempotente: para un `(pedido, idempotency_key)` dado el gateway
//! se toca a lo sumo una vez; los reintentos replican la confirmación
//! original (`alreadySent: true`) con el mismo `message_id`.

use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use serde_json::json;
use uuid::Uuid;

use crm_core::StoreError;

use super::log::{DispatchLogEntry, DispatchLogStore};
use super::order::{resolve_sent_status, OrderStore, SupplierOrder};
use crate::gateway::{MessageGateway, OutboundMessage};
use crate::response::ApiResponse;

pub struct DispatchDeps {
    pub orders:  Arc<dyn OrderStore>,
    pub log:     Arc<dyn DispatchLogStore>,
    pub gateway: Arc<dyn MessageGateway>,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchRequest {
    /// Clave provista por el caller; sin ella el replay es best-effort
    /// (basado en `sent_at` del pedido).
    pub idempotency_key: Option<String>,
    /// Destinatario explícito; si falta se usa el email del proveedor.
    pub to_email: Option<String>,
}

pub fn dispatch_order(deps: &DispatchDeps, order_id: Uuid, request: &DispatchRequest) -> ApiResponse {
    let order = match deps.orders.get(order_id) {
        Ok(Some(order)) => order,
        Ok(None) => {
            return ApiResponse::with_status(404, json!({"error": "Order not found"}));
        }
        Err(err) => {
            error!("dispatch:order-load-failed order_id={order_id} error={err}");
            return ApiResponse::with_status(500, json!({"error": "Dispatch failed"}));
        }
    };

    let Some(recipient) = request.to_email
                                 .clone()
                                 .or_else(|| order.supplier_email.clone())
                                 .filter(|e| !e.trim().is_empty())
    else {
        return ApiResponse::with_status(400, json!({"error": "No recipient email for supplier order"}));
    };

    if order.items.is_empty() {
        return ApiResponse::with_status(400, json!({"error": "Order has no items"}));
    }

    if let Some(key) = request.idempotency_key.as_deref() {
        match deps.log.find(order_id, key) {
            Ok(Some(entry)) => {
                info!("dispatch:replay order_id={order_id} key={key} message_id={}", entry.message_id);
                // Re-sincroniza el pedido si el update original se perdió.
                if order.sent_at.is_none() {
                    let resynced = SupplierOrder { status:          resolve_sent_status(&order.status),
                                                   sent_at:         Some(entry.sent_at),
                                                   sent_to_email:   Some(entry.to_email.clone()),
                                                   idempotency_key: Some(key.to_string()),
                                                   ..order.clone() };
                    if let Err(err) = deps.orders.update(&resynced) {
                        warn!("dispatch:resync-failed order_id={order_id} error={err}");
                    }
                }
                return ApiResponse::ok(json!({
                    "success": true,
                    "alreadySent": true,
                    "messageId": entry.message_id,
                    "sentAt": entry.sent_at,
                }));
            }
            Ok(None) => {}
            Err(err) => {
                error!("dispatch:log-lookup-failed order_id={order_id} key={key} error={err}");
                return ApiResponse::with_status(500, json!({"error": "Dispatch failed"}));
            }
        }
        // El pedido recuerda la última clave usada; cubre logs purgados.
        if order.idempotency_key.as_deref() == Some(key) && order.sent_at.is_some() {
            info!("dispatch:replay-from-order order_id={order_id} key={key}");
            return ApiResponse::ok(json!({
                "success": true,
                "alreadySent": true,
                "messageId": serde_json::Value::Null,
                "sentAt": order.sent_at,
            }));
        }
    } else if order.sent_at.is_some() {
        // Sin clave sólo hay replay best-effort: un pedido ya enviado no se
        // reenvía por accidente.
        info!("dispatch:already-sent order_id={order_id}");
        return ApiResponse::ok(json!({
            "success": true,
            "alreadySent": true,
            "messageId": serde_json::Value::Null,
            "sentAt": order.sent_at,
        }));
    }

    let message = build_message(&order, &recipient);
    let message_id = match deps.gateway.send(&message) {
        Ok(id) => id,
        Err(err) => {
            error!("dispatch:send-failed order_id={order_id} error={err}");
            return ApiResponse::with_status(500, json!({"error": "Failed to send order"}));
        }
    };

    let sent_at = Utc::now();

    if let Some(key) = request.idempotency_key.as_deref() {
        let entry = DispatchLogEntry { order_id,
                                       idempotency_key: key.to_string(),
                                       to_email: recipient.clone(),
                                       message_id: message_id.clone(),
                                       payload: json!({
                                           "orderNumber": order.order_number,
                                           "supplier": order.supplier_name,
                                           "items": order.items,
                                       }),
                                       sent_at };
        match deps.log.insert(&entry) {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(detail)) => {
                // Carrera perdida contra otro worker: el mensaje ya salió una
                // vez por esta clave, la fila existente manda.
                warn!("dispatch:log-race order_id={order_id} key={key} detail={detail}");
            }
            Err(err) => {
                warn!("dispatch:log-write-failed order_id={order_id} key={key} error={err}");
            }
        }
    }

    let updated = SupplierOrder { status:          resolve_sent_status(&order.status),
                                  sent_at:         Some(sent_at),
                                  sent_to_email:   Some(recipient.clone()),
                                  idempotency_key: request.idempotency_key.clone(),
                                  ..order };
    if let Err(err) = deps.orders.update(&updated) {
        warn!("dispatch:order-update-failed order_id={order_id} error={err}");
    }

    info!("dispatch:sent order_id={order_id} message_id={message_id} to={recipient}");
    ApiResponse::ok(json!({
        "success": true,
        "alreadySent": false,
        "messageId": message_id,
        "sentTo": recipient,
    }))
}

fn build_message(order: &SupplierOrder, recipient: &str) -> OutboundMessage {
    let mut body = format!("Bestellung {}\nLieferant: {}\n\nPositionen:\n",
                           order.order_number, order.supplier_name);
    for item in &order.items {
        body.push_str(&format!("- {} x{}\n", item.description, item.quantity));
    }
    OutboundMessage { to:      recipient.to_string(),
                      subject: format!("Bestellung {}", order.order_number),
                      body }
}
