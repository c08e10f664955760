use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use thiserror::Error;

use super::store::{AdmissionStore, InsertOutcome};
use crate::errors::StoreError;

/// Resultado tipado de la admisión. Separa "duplicado esperado" de "falla
/// real": un duplicado no es un error y nunca se reporta como tal.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Primera ocurrencia: el caller procede a ejecutar el workflow y DEBE
    /// escribir el resultado con `complete` una vez disponible.
    Reserved,
    /// Ocurrencia repetida. Contiene el `result_snapshot` almacenado, o
    /// `None` si el primer intento sigue en vuelo (respuesta transitoria
    /// "in-progress"; jamás re-dispara efectos).
    Duplicate(Option<Value>),
}

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("idempotency key must not be empty")]
    EmptyKey,
    /// La indisponibilidad del storage se propaga: la reserva es una
    /// precondición que el caller no puede saltear.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Guard de admisión: decide primera-ocurrencia vs duplicado para un trigger
/// externo identificado por `(scope, key)`.
pub struct AdmissionGuard {
    store: Arc<dyn AdmissionStore>,
}

impl AdmissionGuard {
    pub fn new(store: Arc<dyn AdmissionStore>) -> Self {
        Self { store }
    }

    /// Reserva atómica del trigger. Exactamente un caller concurrente obtiene
    /// `Reserved`; el resto observa `Duplicate`.
    pub fn reserve(&self, scope: &str, key: &str, payload: Value) -> Result<Admission, AdmissionError> {
        if key.trim().is_empty() {
            return Err(AdmissionError::EmptyKey);
        }

        match self.store.insert_if_absent(scope, key, payload)? {
            InsertOutcome::Inserted => {
                debug!("admission:reserved scope={scope} key={key}");
                Ok(Admission::Reserved)
            }
            InsertOutcome::Exists(record) => {
                info!("admission:duplicate scope={scope} key={key} has_result={}",
                      record.result_snapshot.is_some());
                Ok(Admission::Duplicate(record.result_snapshot))
            }
        }
    }

    /// Escribe el resultado visible externamente sobre la reserva creada por
    /// este mismo request, para que duplicados posteriores lo repliquen.
    pub fn complete(&self, scope: &str, key: &str, result: Value) -> Result<(), AdmissionError> {
        self.store.record_result(scope, key, result)?;
        debug!("admission:completed scope={scope} key={key}");
        Ok(())
    }

    /// Libera la reserva tras una falla del workflow, best-effort, para que la
    /// redelivery del proveedor pueda ser admitida de nuevo. Los errores se
    /// registran y no se propagan.
    pub fn release(&self, scope: &str, key: &str) {
        if let Err(err) = self.store.remove(scope, key) {
            warn!("admission:release-failed scope={scope} key={key} error={err}");
        }
    }
}
