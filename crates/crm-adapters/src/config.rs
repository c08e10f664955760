//! Carga de configuración de los adaptadores desde variables de entorno.
//! Convención: `APP_ENV` y `BOOKING_WEBHOOK_SECRET`, con `.env` opcional.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        match env::var("APP_ENV") {
            Ok(v) if v.eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Configuración del webhook entrante. El secret puede faltar: en development
/// se permite con warning, en production se rechaza todo request.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub secret: Option<String>,
    pub environment: Environment,
}

impl WebhookConfig {
    pub fn new(secret: Option<String>, environment: Environment) -> Self {
        Self { secret, environment }
    }

    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let secret = env::var("BOOKING_WEBHOOK_SECRET").ok().filter(|s| !s.is_empty());
        Self { secret,
               environment: Environment::from_env() }
    }
}
