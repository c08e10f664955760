//! Steps construidos a partir de closures.
//!
//! Permite armar la lista ordenada de steps como datos (nombre + funciones),
//! sin declarar un tipo por cada unidad de trabajo. El resultado implementa
//! `Step` y es introspectable por nombre en logs y `WorkflowRun`.

use serde_json::Value;

use super::definition::Step;
use crate::errors::CoreError;
use crate::retry::RetryPolicy;

type ExecuteFn = Box<dyn Fn() -> Result<Value, CoreError> + Send + Sync>;
type ValidateFn = Box<dyn Fn(&Value) -> bool + Send + Sync>;
type CompensateFn = Box<dyn Fn(&Value) -> Result<(), CoreError> + Send + Sync>;

pub struct FnStep {
    name: String,
    execute: ExecuteFn,
    validate: Option<ValidateFn>,
    compensate: Option<CompensateFn>,
    retry: RetryPolicy,
    stop_on_failure: bool,
}

impl FnStep {
    pub fn new<F>(name: impl Into<String>, execute: F) -> Self
        where F: Fn() -> Result<Value, CoreError> + Send + Sync + 'static
    {
        Self { name: name.into(),
               execute: Box::new(execute),
               validate: None,
               compensate: None,
               retry: RetryPolicy::default(),
               stop_on_failure: true }
    }

    /// Reemplaza la validación por defecto (resultado no nulo).
    pub fn validate<F>(mut self, validate: F) -> Self
        where F: Fn(&Value) -> bool + Send + Sync + 'static
    {
        self.validate = Some(Box::new(validate));
        self
    }

    /// Declara la compensación best-effort del step.
    pub fn compensate<F>(mut self, compensate: F) -> Self
        where F: Fn(&Value) -> Result<(), CoreError> + Send + Sync + 'static
    {
        self.compensate = Some(Box::new(compensate));
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Desactiva los reintentos: un único intento.
    pub fn no_retry(mut self) -> Self {
        self.retry = RetryPolicy::none();
        self
    }

    /// Una falla definitiva de este step no aborta los steps posteriores
    /// (el run global igualmente queda en fallo).
    pub fn continue_on_failure(mut self) -> Self {
        self.stop_on_failure = false;
        self
    }
}

impl Step for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> Result<Value, CoreError> {
        (self.execute)()
    }

    fn validate(&self, result: &Value) -> bool {
        match &self.validate {
            Some(f) => f(result),
            None => !result.is_null(),
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn stop_on_failure(&self) -> bool {
        self.stop_on_failure
    }

    fn compensates(&self) -> bool {
        self.compensate.is_some()
    }

    fn compensate(&self, result: &Value) -> Result<(), CoreError> {
        match &self.compensate {
            Some(f) => f(result),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for FnStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep")
         .field("name", &self.name)
         .field("retry", &self.retry)
         .field("stop_on_failure", &self.stop_on_failure)
         .field("compensates", &self.compensate.is_some())
         .finish()
    }
}
