//! Gateway de mensajes salientes (email de confirmación, pedidos).
//!
//! La referencia externa devuelta por `send` es monótona: sirve como id de
//! mensaje replicable en confirmaciones. La implementación en memoria guarda
//! todo lo enviado para que los tests puedan afirmar sobre ello.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crm_core::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub trait MessageGateway: Send + Sync {
    /// Envía el mensaje y devuelve la referencia externa asignada.
    fn send(&self, message: &OutboundMessage) -> Result<String, CoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryGateway {
    sent: Mutex<Vec<(String, OutboundMessage)>>,
    counter: AtomicU64,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn sent_lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, OutboundMessage)>> {
        // Un lock envenenado no invalida el registro de envíos.
        self.sent.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn sent_count(&self) -> usize {
        self.sent_lock().len()
    }

    pub fn sent_messages(&self) -> Vec<(String, OutboundMessage)> {
        self.sent_lock().clone()
    }
}

impl MessageGateway for InMemoryGateway {
    fn send(&self, message: &OutboundMessage) -> Result<String, CoreError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let message_id = format!("MSG-{n:06}");
        self.sent_lock().push((message_id.clone(), message.clone()));
        Ok(message_id)
    }
}
