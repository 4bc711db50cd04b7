//! Configuración central de la aplicación.
//! Lee el entorno (`.env` incluido) una vez y expone una estructura
//! inmutable. Los flags de la CLI pisan estos valores.
use std::env;
use std::time::Duration;

use cert_adapters::registry::DEFAULT_HTTP_TIMEOUT_SECS;
use cert_core::constants::DEFAULT_NODE_TIMEOUT_SECS;
use cert_persistence::{init_dotenv, DbConfig, PersistenceError};
use thiserror::Error;

pub const NODE_TIMEOUT_VAR: &str = "CERTFLOW_NODE_TIMEOUT_SECS";
pub const HTTP_TIMEOUT_VAR: &str = "CERTFLOW_HTTP_TIMEOUT_SECS";
/// Un día.
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' (expected 1..=86400 seconds)")]
    InvalidSeconds { key: String, value: String },
    #[error(transparent)]
    Database(#[from] PersistenceError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `None` = backends en memoria.
    pub database: Option<DbConfig>,
    /// Plazo de cada nodo.
    pub node_timeout: Duration,
    /// Timeout de los clientes HTTP de los adaptadores.
    pub http_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { database: None,
               node_timeout: Duration::from_secs(DEFAULT_NODE_TIMEOUT_SECS),
               http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS) }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        init_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let database = match lookup("DATABASE_URL") {
            Some(url) if !url.trim().is_empty() => Some(DbConfig::from_lookup(&lookup)?),
            _ => None,
        };
        let seconds = |key: &str, default: u64| -> Result<Duration, ConfigError> {
            match lookup(key) {
                None => Ok(Duration::from_secs(default)),
                Some(raw) => parse_seconds(key, &raw),
            }
        };
        Ok(Self { database,
                  node_timeout: seconds(NODE_TIMEOUT_VAR, DEFAULT_NODE_TIMEOUT_SECS)?,
                  http_timeout: seconds(HTTP_TIMEOUT_VAR, DEFAULT_HTTP_TIMEOUT_SECS)? })
    }

    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = timeout;
        self
    }
}

fn parse_seconds(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) => timeout_from_secs(key, secs),
        Err(_) => Err(ConfigError::InvalidSeconds { key: key.to_string(),
                                                    value: raw.to_string() }),
    }
}

/// Valida un plazo en segundos (también el de los flags de la CLI).
pub fn timeout_from_secs(key: &str, secs: u64) -> Result<Duration, ConfigError> {
    if (1..=MAX_TIMEOUT_SECS).contains(&secs) {
        Ok(Duration::from_secs(secs))
    } else {
        Err(ConfigError::InvalidSeconds { key: key.to_string(),
                                          value: secs.to_string() })
    }
}
