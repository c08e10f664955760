use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resultado registrado de un step dentro de un `WorkflowRun`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub name: String,
    pub succeeded: bool,
    /// Intentos consumidos (1..=presupuesto de la política).
    pub attempts: u32,
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// Resultado de una compensación. Las fallas de compensación se registran
/// aquí (no sólo en el logger) para que los tests puedan afirmar sobre ellas;
/// nunca alteran el desenlace ya determinado del run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationOutcome {
    pub step_name: String,
    pub succeeded: bool,
    pub error: Option<String>,
}
