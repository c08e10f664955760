//! crm-core: núcleo idempotente de workflows con compensación.
pub mod admission;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod model;
pub mod retry;
pub mod sequence;
pub mod step;

pub use admission::{Admission, AdmissionError, AdmissionGuard, AdmissionRecord, AdmissionStore,
                    InMemoryAdmissionStore, InsertOutcome};
pub use engine::WorkflowEngine;
pub use errors::{classify_error, CoreError, ErrorClass, StoreError};
pub use model::WorkflowRun;
pub use retry::RetryPolicy;
pub use sequence::{format_order_number, InMemorySequenceStore, SequenceStore};
pub use step::{CompensationOutcome, FnStep, Step, StepOutcome};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn two_step_pipeline_completes_and_reports() {
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(FnStep::new("load", || Ok(json!({"count": 2})))),
            Box::new(FnStep::new("send", || Ok(json!({"sent": true})))),
        ];

        let run = WorkflowEngine::new().run(&steps);

        assert!(run.succeeded);
        assert_eq!(run.steps.len(), 2);
        assert!(run.compensations.is_empty());
        assert_eq!(run.steps[0].attempts, 1);

        let summary = run.summary();
        assert_eq!(summary["success"], json!(true));
        assert_eq!(summary["stepsCompleted"], json!(2));
        assert_eq!(summary["stepsTotal"], json!(2));
    }

    #[test]
    fn default_validation_rejects_null_result() {
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(FnStep::new("null-result", || Ok(serde_json::Value::Null)).no_retry()),
        ];

        let run = WorkflowEngine::new().run(&steps);

        assert!(!run.succeeded);
        assert_eq!(run.steps[0].attempts, 1);
        assert!(run.steps[0].error.as_deref().unwrap().contains("validation failed"));
    }

    #[test]
    fn error_classes_are_stable() {
        assert_eq!(classify_error(&CoreError::Validation("x".into())), ErrorClass::Validation);
        assert_eq!(classify_error(&CoreError::Transient("x".into())), ErrorClass::Transient);
        assert_eq!(classify_error(&CoreError::Terminal("x".into())), ErrorClass::Permanent);
        assert_eq!(classify_error(&CoreError::Internal("x".into())), ErrorClass::Permanent);
    }
}
