//! Admisión idempotente de triggers externos.
//!
//! El guard decide, en forma atómica contra almacenamiento durable, si un
//! trigger `(scope, key)` es la primera ocurrencia o un duplicado. Ante un
//! duplicado se replica el resultado ya producido en lugar de re-ejecutar
//! efectos. Un `AdmissionRecord` habilita cero-o-un `WorkflowRun`.

mod guard;
mod store;

pub use guard::{Admission, AdmissionError, AdmissionGuard};
pub use store::{AdmissionRecord, AdmissionStore, InMemoryAdmissionStore, InsertOutcome};
