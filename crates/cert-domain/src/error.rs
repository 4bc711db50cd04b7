use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::run::RunStatus;

/// Errores de validación del dominio. No dependen de I/O; el núcleo los
/// traduce a su propia taxonomía.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("invalid certificate: {0}")]
    CertificateInvalid(String),
    #[error("certificate is expired (notAfter={not_after})")]
    CertificateExpired { not_after: DateTime<Utc> },
    #[error("invalid run transition: {from} -> {to}")]
    InvalidRunTransition { from: RunStatus, to: RunStatus },
}
