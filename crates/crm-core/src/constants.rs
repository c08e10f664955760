//! Constantes del core de workflows.
//!
//! Este módulo agrupa los valores por defecto de la política de reintentos y
//! los scopes de admisión conocidos. Los scopes particionan el espacio de
//! claves de idempotencia: dos clases de trigger distintas nunca colisionan
//! aunque compartan la misma clave literal.

use std::time::Duration;

/// Cantidad máxima de intentos por defecto para un step.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base del backoff lineal entre reintentos (`intentos_completados × base`).
/// No hay espera antes del primer intento.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);

/// Scope de admisión para webhooks de reservas entrantes. El despacho de
/// pedidos no usa el guard: su idempotencia vive en el dispatch log propio.
pub const BOOKING_WEBHOOK_SCOPE: &str = "booking-webhook";
