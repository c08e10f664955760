use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StoreError;

/// Hecho durable de idempotencia. Se crea exactamente una vez por
/// `(scope, key)` vía insert-if-absent atómico; nunca se actualiza, salvo
/// `result_snapshot` escrito por el único caller que creó el registro dentro
/// del mismo request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub scope: String,
    pub key: String,
    /// Payload opaco del trigger, para auditoría y debugging.
    pub payload_snapshot: Value,
    /// Resultado visible externamente, replicado ante duplicados. `None`
    /// mientras el primer intento sigue en vuelo.
    pub result_snapshot: Option<Value>,
    pub first_seen_at: DateTime<Utc>,
}

/// Resultado de la reserva atómica.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Inserted,
    /// Ya existía un registro para `(scope, key)`; se devuelve tal cual.
    Exists(AdmissionRecord),
}

/// Almacenamiento durable de registros de admisión.
///
/// Contrato: `insert_if_absent` DEBE ser una única operación atómica
/// "insertar, fallar si `(scope, key)` existe" — nunca read-then-write,
/// porque entregas duplicadas concurrentes compiten. La atomicidad la provee
/// la primitiva del storage (constraint único / entry-level locking), no un
/// lock del proceso: invocaciones concurrentes pueden correr en procesos
/// distintos.
pub trait AdmissionStore: Send + Sync {
    fn insert_if_absent(&self, scope: &str, key: &str, payload: Value) -> Result<InsertOutcome, StoreError>;

    /// Escribe el `result_snapshot` sobre el registro ya creado.
    fn record_result(&self, scope: &str, key: &str, result: Value) -> Result<(), StoreError>;

    fn get(&self, scope: &str, key: &str) -> Result<Option<AdmissionRecord>, StoreError>;

    /// Elimina una reserva (liberación best-effort tras una falla).
    fn remove(&self, scope: &str, key: &str) -> Result<(), StoreError>;
}

/// Implementación en memoria con paridad de contrato: la atomicidad de
/// `insert_if_absent` la da el entry-locking por shard de `DashMap`.
#[derive(Debug, Default)]
pub struct InMemoryAdmissionStore {
    inner: DashMap<(String, String), AdmissionRecord>,
}

impl InMemoryAdmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl AdmissionStore for InMemoryAdmissionStore {
    fn insert_if_absent(&self, scope: &str, key: &str, payload: Value) -> Result<InsertOutcome, StoreError> {
        match self.inner.entry((scope.to_string(), key.to_string())) {
            Entry::Occupied(entry) => Ok(InsertOutcome::Exists(entry.get().clone())),
            Entry::Vacant(entry) => {
                entry.insert(AdmissionRecord { scope: scope.to_string(),
                                               key: key.to_string(),
                                               payload_snapshot: payload,
                                               result_snapshot: None,
                                               first_seen_at: Utc::now() });
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    fn record_result(&self, scope: &str, key: &str, result: Value) -> Result<(), StoreError> {
        match self.inner.get_mut(&(scope.to_string(), key.to_string())) {
            Some(mut record) => {
                record.result_snapshot = Some(result);
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn get(&self, scope: &str, key: &str) -> Result<Option<AdmissionRecord>, StoreError> {
        Ok(self.inner
               .get(&(scope.to_string(), key.to_string()))
               .map(|r| r.clone()))
    }

    fn remove(&self, scope: &str, key: &str) -> Result<(), StoreError> {
        self.inner.remove(&(scope.to_string(), key.to_string()));
        Ok(())
    }
}
