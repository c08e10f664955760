//! Contadores de secuencia persistidos (p. ej. numeración de pedidos).
//!
//! Invariante: dos admisiones exitosas nunca observan el mismo valor
//! pre-incremento, aun con asignadores concurrentes. El contador NO se modela
//! como variable del proceso: el trait exige que la mutación sea un
//! incremento atómico del storage (o un conditional-update con retry si el
//! backend no lo soporta nativo).

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

use crate::errors::StoreError;

pub trait SequenceStore: Send + Sync {
    /// Entrega el siguiente valor del contador `counter_id`. Nunca repite un
    /// valor entregado, bajo cualquier concurrencia.
    fn next(&self, counter_id: &str) -> Result<i64, StoreError>;
}

/// Implementación en memoria: un `AtomicI64` por contador (incremento atómico
/// nativo, la variante fuerte del conditional-update con retry).
#[derive(Debug)]
pub struct InMemorySequenceStore {
    counters: DashMap<String, AtomicI64>,
    start: i64,
}

impl Default for InMemorySequenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self { counters: DashMap::new(),
               start: 1 }
    }

    /// Siembra el valor inicial de los contadores nuevos.
    pub fn with_start(start: i64) -> Self {
        Self { counters: DashMap::new(),
               start }
    }
}

impl SequenceStore for InMemorySequenceStore {
    fn next(&self, counter_id: &str) -> Result<i64, StoreError> {
        let counter = self.counters
                          .entry(counter_id.to_string())
                          .or_insert_with(|| AtomicI64::new(self.start));
        Ok(counter.fetch_add(1, Ordering::SeqCst))
    }
}

/// Formatea un número de pedido correlativo, p. ej. `K-2025-0001`.
pub fn format_order_number(prefix: &str, year: i32, value: i64) -> String {
    format!("{prefix}{year}-{value:04}")
}
