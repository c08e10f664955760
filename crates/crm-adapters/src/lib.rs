//! crm-adapters: adaptadores de triggers externos sobre el core.
//!
//! Dos superficies:
//! - `booking`: webhook entrante de reservas (firma HMAC, extracción de
//!   payload, admisión idempotente y workflow con compensación).
//! - `dispatch`: envío saliente de pedidos a proveedores (dispatch log único
//!   por `(pedido, idempotency_key)` y replay de confirmaciones).
pub mod booking;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod response;
pub mod signature;

pub use booking::{extract_booking_data, handle_booking_webhook, BookingData, BookingWebhookDeps,
                  CrmDirectory, InMemoryDirectory};
pub use config::{init_dotenv, Environment, WebhookConfig};
pub use dispatch::{dispatch_order, resolve_sent_status, DispatchDeps, DispatchLogEntry,
                   DispatchLogStore, DispatchRequest, InMemoryDispatchLog, InMemoryOrderStore,
                   OrderItem, OrderStore, SupplierOrder};
pub use gateway::{InMemoryGateway, MessageGateway, OutboundMessage};
pub use response::ApiResponse;
pub use signature::{sign_payload, verify_signature, SignatureCheck};
