//! Frontera con el cliente ACME usado por los nodos `apply`. El protocolo
//! ACME no se implementa aquí; sólo el contrato.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::NodeContext;
use crate::errors::AdapterError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub domains: Vec<String>,
    pub contact_email: String,
    /// Proveedor DNS para el challenge y sus credenciales.
    pub challenge_provider: String,
    pub challenge_config: Value,
    pub key_algorithm: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    pub certificate_pem: String,
    pub private_key_pem: String,
}

#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn obtain(&self, ctx: &NodeContext, request: &IssueRequest) -> Result<IssuedCertificate, AdapterError>;
}
