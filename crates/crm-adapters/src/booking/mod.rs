//! Webhook entrante de reservas.
//!
//! `payload` normaliza el JSON del proveedor de calendario, `directory` define
//! el almacén de clientes/proyectos/citas y `handler` orquesta la admisión
//! idempotente y el workflow compensable.

mod directory;
mod handler;
mod payload;

pub use directory::{Appointment, CrmDirectory, Customer, InMemoryDirectory, Project};
pub use handler::{handle_booking_webhook, BookingWebhookDeps};
pub use payload::{extract_booking_data, BookingData};
