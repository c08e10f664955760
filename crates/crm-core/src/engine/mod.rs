//! Motor de ejecución de workflows con compensación.

mod core;

pub use core::WorkflowEngine;
