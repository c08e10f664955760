use serde_json::Value;

use crate::errors::CoreError;
use crate::retry::RetryPolicy;

/// Trait que define un Step del workflow.
///
/// El motor invoca `execute()` hasta agotar el presupuesto de la política de
/// reintentos, validando cada resultado con `validate()`. La compensación se
/// invoca sólo para steps cuyo `execute()` retornó un éxito validado, en orden
/// inverso al de finalización.
pub trait Step: Send + Sync {
    /// Nombre estable del step, usado en logs y auditoría.
    fn name(&self) -> &str;

    /// Ejecuta la unidad de trabajo. Puede bloquear en I/O; el motor no impone
    /// timeout ni cancelación (una vez invocado corre hasta terminar).
    fn execute(&self) -> Result<Value, CoreError>;

    /// Valida el resultado de un intento. Default: el resultado no es null.
    fn validate(&self, result: &Value) -> bool {
        !result.is_null()
    }

    /// Política de reintentos del step.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Si el step falla en forma definitiva, ¿se aborta el resto del workflow?
    /// Default: true. La compensación de steps ya exitosos ocurre igual.
    fn stop_on_failure(&self) -> bool {
        true
    }

    /// Indica si el step declara una compensación. El motor sólo invoca
    /// `compensate` cuando esto es true.
    fn compensates(&self) -> bool {
        false
    }

    /// Deshace, best-effort e idempotente, el efecto externo del step.
    /// Recibe el resultado validado que produjo `execute()`.
    fn compensate(&self, _result: &Value) -> Result<(), CoreError> {
        Ok(())
    }
}
