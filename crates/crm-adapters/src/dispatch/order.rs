//! Pedidos a proveedor y su almacén.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crm_core::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub description: String,
    pub quantity:    u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplierOrder {
    pub id:              Uuid,
    pub order_number:    String,
    pub supplier_name:   String,
    pub supplier_email:  Option<String>,
    pub status:          String,
    pub items:           Vec<OrderItem>,
    pub sent_at:         Option<DateTime<Utc>>,
    pub sent_to_email:   Option<String>,
    pub idempotency_key: Option<String>,
}

/// Estados posteriores a "sent" en el ciclo de vida del pedido. Un reenvío
/// jamás retrocede un pedido que ya avanzó.
const ADVANCED_STATUSES: &[&str] = &["ab_received",
                                     "delivery_note_received",
                                     "goods_receipt_open",
                                     "goods_receipt_booked",
                                     "ready_for_installation"];

/// Estado resultante tras un envío: preserva estados avanzados, el resto pasa
/// a `sent`.
pub fn resolve_sent_status(current: &str) -> String {
    if ADVANCED_STATUSES.contains(&current) {
        current.to_string()
    } else {
        "sent".to_string()
    }
}

pub trait OrderStore: Send + Sync {
    fn get(&self, id: Uuid) -> Result<Option<SupplierOrder>, StoreError>;
    fn update(&self, order: &SupplierOrder) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<Uuid, SupplierOrder>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order: SupplierOrder) {
        self.orders.insert(order.id, order);
    }
}

impl OrderStore for InMemoryOrderStore {
    fn get(&self, id: Uuid) -> Result<Option<SupplierOrder>, StoreError> {
        Ok(self.orders.get(&id).map(|o| o.clone()))
    }

    fn update(&self, order: &SupplierOrder) -> Result<(), StoreError> {
        match self.orders.get_mut(&order.id) {
            Some(mut slot) => {
                *slot = order.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}
