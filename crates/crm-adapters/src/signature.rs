//! Verificación HMAC-SHA256 de firmas de webhooks.
//!
//! La firma llega como hex del HMAC sobre el body crudo. La comparación es en
//! tiempo constante (`Mac::verify_slice`), nunca comparación de strings.

use hmac::{Hmac, Mac};
use log::{error, warn};
use sha2::Sha256;

use crate::config::WebhookConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// Firma válida contra el secret configurado.
    Valid,
    /// Sin secret configurado: se permite con warning (sólo development).
    AllowedWithoutSecret,
    /// Firma ausente o inválida en development: se registra y continúa.
    InvalidAllowed,
    /// Rechazo definitivo (production).
    Rejected,
}

impl SignatureCheck {
    pub fn is_rejected(self) -> bool {
        matches!(self, Self::Rejected)
    }
}

pub fn verify_signature(raw_body: &[u8], signature: Option<&str>, config: &WebhookConfig) -> SignatureCheck {
    let Some(secret) = config.secret.as_deref() else {
        if config.environment.is_production() {
            error!("signature:secret not configured in production, rejecting");
            return SignatureCheck::Rejected;
        }
        warn!("signature:secret not configured, skipping check in development");
        return SignatureCheck::AllowedWithoutSecret;
    };

    let matches = signature.map(|s| signature_matches(raw_body, s, secret))
                           .unwrap_or(false);
    if matches {
        return SignatureCheck::Valid;
    }

    if config.environment.is_production() {
        warn!("signature:invalid or missing signature, rejecting (has_signature={})",
              signature.is_some());
        SignatureCheck::Rejected
    } else {
        warn!("signature:invalid or missing signature, continuing in development");
        SignatureCheck::InvalidAllowed
    }
}

fn signature_matches(raw_body: &[u8], provided_hex: &str, secret: &str) -> bool {
    let Ok(provided) = hex::decode(provided_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    mac.verify_slice(&provided).is_ok()
}

/// Firma un body con el secret dado (hex). Contraparte de `verify_signature`
/// para tests y herramientas.
pub fn sign_payload(raw_body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}
