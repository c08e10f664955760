//! Core WorkflowEngine implementation
//!
//! Ejecuta una lista ordenada de steps en forma secuencial y single-threaded:
//! reintentos por step según su política, validación de cada resultado y, si
//! un step falla en forma definitiva, compensación best-effort de todos los
//! steps ya exitosos en orden inverso (último exitoso primero).
//!
//! Garantías:
//! - La compensación sólo alcanza steps cuyo `execute()` retornó un éxito
//!   validado; un step nunca se compensa dos veces.
//! - El motor nunca deja escapar una excepción de step: todo desenlace
//!   (incluidas fallas de compensación) queda capturado en el `WorkflowRun`.
//! - El motor no reintenta el workflow completo; el retry aplica sólo dentro
//!   de los intentos de un step.

use std::time::Instant;

use chrono::Utc;
use log::{debug, error, info, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::model::WorkflowRun;
use crate::step::{CompensationOutcome, Step, StepOutcome};

#[derive(Debug, Default)]
pub struct WorkflowEngine;

impl WorkflowEngine {
    pub fn new() -> Self {
        Self
    }

    /// Ejecuta el workflow completo y retorna su registro inmutable.
    pub fn run(&self, steps: &[Box<dyn Step>]) -> WorkflowRun {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();

        info!("workflow:start run_id={run_id} steps={}", steps.len());

        let mut outcomes: Vec<StepOutcome> = Vec::with_capacity(steps.len());
        let mut compensations: Vec<CompensationOutcome> = Vec::new();
        // Steps exitosos aún no compensados, en orden de finalización.
        let mut succeeded: Vec<(usize, Value)> = Vec::new();

        let mut index = 0;
        while index < steps.len() {
            let step = &steps[index];
            let outcome = self.attempt_step(index, steps.len(), step.as_ref());

            let failed = !outcome.succeeded;
            if outcome.succeeded {
                let result = outcome.result.clone().unwrap_or(Value::Null);
                succeeded.push((index, result));
            }
            outcomes.push(outcome);

            if failed {
                error!("workflow:step-failed run_id={run_id} step={} rolling back {} step(s)",
                       step.name(),
                       succeeded.len());
                self.compensate_all(steps, &mut succeeded, &mut compensations);

                if step.stop_on_failure() {
                    break;
                }
            }
            index += 1;
        }

        let run = WorkflowRun { run_id,
                                succeeded: outcomes.iter().all(|o| o.succeeded),
                                steps: outcomes,
                                compensations,
                                started_at,
                                total_duration_ms: clock.elapsed().as_millis() as u64 };

        info!("workflow:done run_id={run_id} success={} duration_ms={} completed={}/{}",
              run.succeeded,
              run.total_duration_ms,
              run.succeeded_steps(),
              run.steps.len());
        run
    }

    /// Intenta un step hasta agotar su presupuesto de reintentos. Una falla de
    /// validación cuenta como falla del intento (el próximo intento re-invoca
    /// `execute()` completo).
    fn attempt_step(&self, index: usize, total: usize, step: &dyn Step) -> StepOutcome {
        let policy = step.retry_policy();
        let budget = policy.attempt_budget();
        let mut attempts = 0;
        let mut last_error: Option<String> = None;

        while attempts < budget {
            if attempts > 0 {
                let delay = policy.delay_for(attempts);
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
            attempts += 1;
            debug!("workflow:attempt step={}/{} name={} attempt={}/{}",
                   index + 1,
                   total,
                   step.name(),
                   attempts,
                   budget);

            match step.execute() {
                Ok(result) => {
                    if step.validate(&result) {
                        info!("workflow:step-ok step={}/{} name={} attempts={}",
                              index + 1,
                              total,
                              step.name(),
                              attempts);
                        return StepOutcome { name: step.name().to_string(),
                                             succeeded: true,
                                             attempts,
                                             result: Some(result),
                                             error: None };
                    }
                    last_error = Some(format!("validation failed for step: {}", step.name()));
                    warn!("workflow:validation-failed name={} attempt={}/{}",
                          step.name(),
                          attempts,
                          budget);
                }
                Err(err) => {
                    last_error = Some(err.to_string());
                    warn!("workflow:attempt-failed name={} attempt={}/{} error={err}",
                          step.name(),
                          attempts,
                          budget);
                }
            }
        }

        StepOutcome { name: step.name().to_string(),
                      succeeded: false,
                      attempts,
                      result: None,
                      error: last_error }
    }

    /// Compensa los steps exitosos en orden inverso, drenando la pila para que
    /// ningún step se compense dos veces. Una compensación que falla se
    /// registra y no bloquea las restantes.
    fn compensate_all(&self,
                      steps: &[Box<dyn Step>],
                      succeeded: &mut Vec<(usize, Value)>,
                      compensations: &mut Vec<CompensationOutcome>) {
        for (index, result) in std::mem::take(succeeded).into_iter().rev() {
            let step = &steps[index];
            if !step.compensates() {
                continue;
            }
            info!("workflow:compensate step={}", step.name());
            match step.compensate(&result) {
                Ok(()) => {
                    compensations.push(CompensationOutcome { step_name: step.name().to_string(),
                                                             succeeded: true,
                                                             error: None });
                }
                Err(err) => {
                    error!("workflow:compensation-failed step={} error={err}", step.name());
                    compensations.push(CompensationOutcome { step_name: step.name().to_string(),
                                                             succeeded: false,
                                                             error: Some(err.to_string()) });
                }
            }
        }
    }
}
