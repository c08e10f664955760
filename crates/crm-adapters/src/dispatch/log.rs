//! Dispatch log: una fila única por `(pedido, idempotency_key)`.
//!
//! La fila se escribe tras el envío y es la fuente de verdad para el replay:
//! un reintento con la misma clave devuelve el `message_id` original sin
//! volver a tocar el gateway.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crm_core::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchLogEntry {
    pub order_id:        Uuid,
    pub idempotency_key: String,
    pub to_email:        String,
    pub message_id:      String,
    pub payload:         Value,
    pub sent_at:         DateTime<Utc>,
}

pub trait DispatchLogStore: Send + Sync {
    fn find(&self, order_id: Uuid, idempotency_key: &str) -> Result<Option<DispatchLogEntry>, StoreError>;

    /// Inserta la fila; `UniqueViolation` si ya existe una con la misma clave.
    fn insert(&self, entry: &DispatchLogEntry) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryDispatchLog {
    entries: DashMap<(Uuid, String), DispatchLogEntry>,
}

impl InMemoryDispatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DispatchLogStore for InMemoryDispatchLog {
    fn find(&self, order_id: Uuid, idempotency_key: &str) -> Result<Option<DispatchLogEntry>, StoreError> {
        Ok(self.entries
               .get(&(order_id, idempotency_key.to_string()))
               .map(|e| e.clone()))
    }

    fn insert(&self, entry: &DispatchLogEntry) -> Result<(), StoreError> {
        match self.entries.entry((entry.order_id, entry.idempotency_key.clone())) {
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(())
            }
            Entry::Occupied(_) => {
                Err(StoreError::UniqueViolation(format!("dispatch log ({}, {})",
                                                        entry.order_id, entry.idempotency_key)))
            }
        }
    }
}
