//! Política de reintentos por step.
//!
//! Cada intento re-invoca `execute()` completo: el diseño asume que los steps
//! son idempotentes por naturaleza o toleran re-ejecución at-least-once. El
//! core no deduplica dentro de los reintentos de un mismo step; esa
//! responsabilidad es del step (p. ej. usando el `AdmissionGuard` para todo
//! efecto externo que cree estado).

use std::time::Duration;

use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BASE};

/// Decide `retry | giveUp` para un step dado el número de intentos previos.
///
/// Por defecto: hasta 3 intentos con backoff lineal `intentos × 1s` (sin
/// espera antes del primer intento). `retry_on_failure = false` desactiva los
/// reintentos por completo (un único intento).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub retry_on_failure: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS,
               base_delay: DEFAULT_RETRY_BASE,
               retry_on_failure: true }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts,
               base_delay,
               retry_on_failure: true }
    }

    /// Política sin reintentos: un único intento.
    pub fn none() -> Self {
        Self { max_attempts: 1,
               base_delay: Duration::ZERO,
               retry_on_failure: false }
    }

    /// Cantidad efectiva de intentos permitidos (nunca menor a 1).
    pub fn attempt_budget(&self) -> u32 {
        if self.retry_on_failure {
            self.max_attempts.max(1)
        } else {
            1
        }
    }

    /// Espera previa al siguiente intento, dados los intentos ya completados.
    pub fn delay_for(&self, completed_attempts: u32) -> Duration {
        self.base_delay.saturating_mul(completed_attempts)
    }
}
