//! Errores específicos del core y de la capa de almacenamiento.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error producido por un step o por el motor.
///
/// La distinción retryable/terminal NO la decide el motor: el step la codifica
/// en su `RetryPolicy`. Las variantes existen para auditoría y clasificación.
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("terminal failure: {0}")]
    Terminal(String),
    #[error("internal: {0}")]
    Internal(String),
}

/// Clasificación gruesa de un `CoreError` para reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Transient,
    Permanent,
}

/// Mapea un `CoreError` a su clase estable (usada en logs y auditoría).
pub fn classify_error(error: &CoreError) -> ErrorClass {
    match error {
        CoreError::Validation(_) => ErrorClass::Validation,
        CoreError::Transient(_) => ErrorClass::Transient,
        CoreError::Terminal(_) | CoreError::Internal(_) => ErrorClass::Permanent,
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict | StoreError::Unavailable(_) => CoreError::Transient(err.to_string()),
            StoreError::UniqueViolation(_) | StoreError::NotFound => CoreError::Terminal(err.to_string()),
        }
    }
}

/// Errores de la capa de almacenamiento durable (admisión, contadores, logs
/// de despacho). La violación de unicidad es la señal de duplicado en
/// `insert_if_absent`; la indisponibilidad se propaga al caller porque la
/// admisión es una precondición, no best-effort.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("not found")]
    NotFound,
    #[error("conflict (retryable)")]
    Conflict,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
