//! Tests del motor: reintentos, compensación en orden inverso y resiliencia.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crm_core::{CoreError, FnStep, RetryPolicy, Step, WorkflowEngine};
use serde_json::json;

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy { max_attempts,
                  base_delay: Duration::ZERO,
                  retry_on_failure: true }
}

#[test]
fn retry_exhaustion_invokes_execute_exactly_max_attempts_times() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_in_step = Arc::clone(&calls);

    // validate siempre falso: cada intento re-invoca execute() completo.
    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(FnStep::new("never-valid", move || {
                     calls_in_step.fetch_add(1, Ordering::SeqCst);
                     Ok(json!({"attempted": true}))
                 }).validate(|_| false)
                   .retry(fast_retry(3))),
    ];

    let run = WorkflowEngine::new().run(&steps);

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(!run.succeeded);
    assert!(!run.steps[0].succeeded);
    assert_eq!(run.steps[0].attempts, 3);
}

#[test]
fn retry_disabled_means_single_attempt() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_in_step = Arc::clone(&calls);

    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(FnStep::new("fails-once", move || {
                     calls_in_step.fetch_add(1, Ordering::SeqCst);
                     Err(CoreError::Transient("network".into()))
                 }).no_retry()),
    ];

    let run = WorkflowEngine::new().run(&steps);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(run.steps[0].attempts, 1);
    assert!(!run.succeeded);
}

#[test]
fn transient_failure_recovers_within_retry_budget() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_in_step = Arc::clone(&calls);

    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(FnStep::new("flaky", move || {
                     let n = calls_in_step.fetch_add(1, Ordering::SeqCst);
                     if n < 2 {
                         Err(CoreError::Transient("db hiccup".into()))
                     } else {
                         Ok(json!({"ok": true}))
                     }
                 }).retry(fast_retry(3))),
    ];

    let run = WorkflowEngine::new().run(&steps);

    assert!(run.succeeded);
    assert_eq!(run.steps[0].attempts, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// Construye un step exitoso que registra su compensación en `log`.
fn compensable_ok(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> FnStep {
    FnStep::new(name, move || Ok(json!({"step": name})))
        .compensate(move |_result| {
            log.lock().unwrap().push(name.to_string());
            Ok(())
        })
}

#[test]
fn compensation_runs_in_reverse_order_and_skips_the_failed_step() {
    let order = Arc::new(Mutex::new(Vec::new()));

    let failing_log = Arc::clone(&order);
    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(compensable_ok("a", Arc::clone(&order))),
        Box::new(compensable_ok("b", Arc::clone(&order))),
        Box::new(FnStep::new("c", || Err(CoreError::Terminal("business rule".into())))
            .compensate(move |_| {
                failing_log.lock().unwrap().push("c".to_string());
                Ok(())
            })
            .no_retry()),
    ];

    let run = WorkflowEngine::new().run(&steps);

    // C falló: nunca se compensa. B y A se compensan, último exitoso primero.
    assert_eq!(*order.lock().unwrap(), vec!["b".to_string(), "a".to_string()]);
    assert!(!run.succeeded);
    assert_eq!(run.steps.len(), 3);
    assert!(run.steps[0].succeeded && run.steps[1].succeeded && !run.steps[2].succeeded);
}

#[test]
fn compensation_failure_does_not_block_remaining_compensations() {
    let order = Arc::new(Mutex::new(Vec::new()));

    let a_log = Arc::clone(&order);
    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(FnStep::new("a", || Ok(json!({"step": "a"}))).compensate(move |_| {
            a_log.lock().unwrap().push("a".to_string());
            Ok(())
        })),
        Box::new(FnStep::new("b", || Ok(json!({"step": "b"})))
            .compensate(|_| Err(CoreError::Internal("undo failed".into())))),
        Box::new(FnStep::new("c", || Err(CoreError::Terminal("boom".into()))).no_retry()),
    ];

    let run = WorkflowEngine::new().run(&steps);

    // compensate(b) falló, pero compensate(a) corre igual.
    assert_eq!(*order.lock().unwrap(), vec!["a".to_string()]);

    // El run sigue reportando la falla de C, no el error de compensación.
    assert!(!run.succeeded);
    assert!(run.steps[2].error.as_deref().unwrap().contains("boom"));

    // La falla de compensación queda expuesta en el registro estructurado.
    assert_eq!(run.compensations.len(), 2);
    assert_eq!(run.compensations[0].step_name, "b");
    assert!(!run.compensations[0].succeeded);
    assert_eq!(run.compensations[1].step_name, "a");
    assert!(run.compensations[1].succeeded);
}

#[test]
fn stop_on_failure_aborts_remaining_steps() {
    let later_ran = Arc::new(AtomicU32::new(0));
    let later_in_step = Arc::clone(&later_ran);

    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(FnStep::new("fails", || Err(CoreError::Terminal("stop here".into()))).no_retry()),
        Box::new(FnStep::new("later", move || {
            later_in_step.fetch_add(1, Ordering::SeqCst);
            Ok(json!(1))
        })),
    ];

    let run = WorkflowEngine::new().run(&steps);

    assert_eq!(later_ran.load(Ordering::SeqCst), 0);
    assert_eq!(run.steps.len(), 1);
    assert!(!run.succeeded);
}

#[test]
fn continue_on_failure_still_runs_later_steps_but_run_fails() {
    let order = Arc::new(Mutex::new(Vec::new()));

    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(compensable_ok("a", Arc::clone(&order))),
        Box::new(FnStep::new("b", || Err(CoreError::Terminal("soft".into())))
            .no_retry()
            .continue_on_failure()),
        Box::new(FnStep::new("c", || Ok(json!({"step": "c"})))),
    ];

    let run = WorkflowEngine::new().run(&steps);

    assert_eq!(run.steps.len(), 3);
    assert!(run.steps[2].succeeded);
    assert!(!run.succeeded);
    // A se compensó cuando falló B; no vuelve a compensarse después.
    assert_eq!(*order.lock().unwrap(), vec!["a".to_string()]);
}

#[test]
fn run_records_results_and_duration() {
    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(FnStep::new("produce", || Ok(json!({"value": 42})))),
    ];

    let run = WorkflowEngine::new().run(&steps);

    assert!(run.succeeded);
    assert_eq!(run.steps[0].result, Some(json!({"value": 42})));
    assert!(run.steps[0].error.is_none());
    assert_eq!(run.first_error(), None);
}
