//! Envío idempotente de pedidos a proveedores.
//!
//! `order` modela el pedido y su estado, `log` el registro único por
//! `(pedido, idempotency_key)` y `handler` la operación de despacho con
//! replay de confirmaciones ya enviadas.

mod handler;
mod log;
mod order;

pub use handler::{dispatch_order, DispatchDeps, DispatchRequest};
pub use log::{DispatchLogEntry, DispatchLogStore, InMemoryDispatchLog};
pub use order::{resolve_sent_status, InMemoryOrderStore, OrderItem, OrderStore, SupplierOrder};
