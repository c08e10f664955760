//! Registro de ejecución de un workflow.
//!
//! Un `WorkflowRun` se crea cuando el motor arranca y es inmutable una vez
//! devuelto al caller: una re-ejecución, incluso tras una falla, es un run
//! nuevo. El resumen estructurado alimenta el logging y el `result_snapshot`
//! que el guard de admisión replica ante duplicados.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::step::{CompensationOutcome, StepOutcome};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub run_id: Uuid,
    /// true sólo si todos los steps registrados terminaron en éxito.
    pub succeeded: bool,
    pub steps: Vec<StepOutcome>,
    pub compensations: Vec<CompensationOutcome>,
    pub started_at: DateTime<Utc>,
    pub total_duration_ms: u64,
}

impl WorkflowRun {
    /// Cantidad de steps que terminaron en éxito.
    pub fn succeeded_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.succeeded).count()
    }

    /// Primer error registrado, si lo hay.
    pub fn first_error(&self) -> Option<&str> {
        self.steps
            .iter()
            .find_map(|s| s.error.as_deref())
    }

    /// Resumen consumible por el caller: éxito por step, error, payload de
    /// resultado y duración total. Reporta fielmente lo ocurrido, incluidas
    /// las fallas de compensación.
    pub fn summary(&self) -> Value {
        json!({
            "runId": self.run_id,
            "success": self.succeeded,
            "startedAt": self.started_at,
            "totalDuration": self.total_duration_ms,
            "steps": self.steps,
            "compensations": self.compensations,
            "stepsCompleted": self.succeeded_steps(),
            "stepsTotal": self.steps.len(),
        })
    }
}
