//! Taxonomía de errores del núcleo.
//!
//! - `WorkflowError`: lo que un procesador de nodo devuelve al orquestador.
//! - `AdapterError`: fallos de adaptadores (deployers, uploaders, notifiers).
//! - `RepositoryError`: fallos de los backends de persistencia.
//!
//! Las conversiones `From` permiten componer con `?` entre capas.

use cert_domain::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Clase estable de un `WorkflowError`, útil para decisiones del
/// orquestador (p.ej. marcar un run como cancelado en vez de fallido).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ConfigurationInvalid,
    CertificateInvalid,
    CertificateExpired,
    RecordNotFound,
    ExternalCallFailed,
    PersistenceFailed,
    Canceled,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),
    #[error("certificate invalid: {0}")]
    CertificateInvalid(String),
    #[error("certificate is expired (notAfter={not_after})")]
    CertificateExpired { not_after: DateTime<Utc> },
    #[error("record not found: {0}")]
    RecordNotFound(String),
    #[error("[{provider}] failed to execute request '{operation}': {message}")]
    ExternalCallFailed { provider: String, operation: String, message: String },
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),
    #[error("canceled: {0}")]
    Canceled(String),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::ConfigurationInvalid(_) => ErrorKind::ConfigurationInvalid,
            WorkflowError::CertificateInvalid(_) => ErrorKind::CertificateInvalid,
            WorkflowError::CertificateExpired { .. } => ErrorKind::CertificateExpired,
            WorkflowError::RecordNotFound(_) => ErrorKind::RecordNotFound,
            WorkflowError::ExternalCallFailed { .. } => ErrorKind::ExternalCallFailed,
            WorkflowError::PersistenceFailed(_) => ErrorKind::PersistenceFailed,
            WorkflowError::Canceled(_) => ErrorKind::Canceled,
        }
    }
}

impl From<DomainError> for WorkflowError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidConfiguration(m) => WorkflowError::ConfigurationInvalid(m),
            DomainError::CertificateInvalid(m) => WorkflowError::CertificateInvalid(m),
            DomainError::CertificateExpired { not_after } => WorkflowError::CertificateExpired { not_after },
            // sólo el orquestador transiciona runs; llegar aquí es un uso indebido
            other @ DomainError::InvalidRunTransition { .. } => WorkflowError::ConfigurationInvalid(other.to_string()),
        }
    }
}

/// Error de un adaptador de proveedor. Siempre lleva el proveedor y, para
/// llamadas externas, el nombre de la operación.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("[{provider}] invalid configuration: {message}")]
    Configuration { provider: String, message: String },
    #[error("[{provider}] failed to execute request '{operation}': {message}")]
    Request { provider: String, operation: String, message: String },
    #[error("[{provider}] certificate rejected: {message}")]
    Certificate { provider: String, message: String },
    #[error("operation '{operation}' canceled")]
    Canceled { operation: String },
}

impl AdapterError {
    pub fn config(provider: &str, message: impl Into<String>) -> Self {
        AdapterError::Configuration { provider: provider.to_string(),
                                      message: message.into() }
    }

    /// Material PEM que el adaptador no puede usar.
    pub fn certificate(provider: &str, message: impl ToString) -> Self {
        AdapterError::Certificate { provider: provider.to_string(),
                                    message: message.to_string() }
    }

    pub fn request(provider: &str, operation: &str, message: impl ToString) -> Self {
        AdapterError::Request { provider: provider.to_string(),
                                operation: operation.to_string(),
                                message: message.to_string() }
    }
}

impl From<AdapterError> for WorkflowError {
    fn from(err: AdapterError) -> Self {
        match err {
            e @ AdapterError::Configuration { .. } => WorkflowError::ConfigurationInvalid(e.to_string()),
            AdapterError::Request { provider, operation, message } => {
                WorkflowError::ExternalCallFailed { provider, operation, message }
            }
            e @ AdapterError::Certificate { .. } => WorkflowError::CertificateInvalid(e.to_string()),
            e @ AdapterError::Canceled { .. } => WorkflowError::Canceled(e.to_string()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}

impl From<RepositoryError> for WorkflowError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(m) => WorkflowError::RecordNotFound(m),
            other => WorkflowError::PersistenceFailed(other.to_string()),
        }
    }
}
