//! Definiciones relacionadas a Steps.
//!
//! Un step es la unidad de trabajo de un workflow, con su propia política de
//! reintentos y su compensación opcional. Este módulo define:
//! - `Step`: interfaz neutral usada por el motor.
//! - `FnStep`: construcción de steps como datos a partir de closures.
//! - `StepOutcome` / `CompensationOutcome`: resultados registrados por el
//!   motor en el `WorkflowRun`.

pub mod definition;
pub mod func;
mod outcome;

pub use definition::Step;
pub use func::FnStep;
pub use outcome::{CompensationOutcome, StepOutcome};
