//! Modelos de ejecución: el registro inmutable de un run.

mod run;

pub use run::WorkflowRun;
