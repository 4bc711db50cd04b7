//! Contrato de adaptadores de proveedor.
//!
//! Un adaptador se construye a partir de un nombre de proveedor y su
//! configuración JSON (fábricas), recibe el `LogSink` del nodo dueño y expone
//! una única operación asíncrona. Reglas comunes:
//! - La construcción valida campos de identidad (credenciales, región,
//!   instancia) antes de cualquier llamada de red.
//! - Cada fallo externo se envuelve con proveedor y nombre de operación
//!   (`AdapterError::Request`).
//! - Sin reintentos internos: la política de reintento pertenece al
//!   orquestador, por lo que invocar dos veces con la misma entrada debe ser
//!   seguro.
//! - Toda llamada externa pasa por `NodeContext::guard`.
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::NodeContext;
use crate::errors::AdapterError;
use crate::logging::LogSink;

pub mod domain;
pub mod issuer;
pub mod notify;

pub use domain::{normalize_wildcard_domain, WildcardStyle};
pub use issuer::{CertificateIssuer, IssueRequest, IssuedCertificate};
pub use notify::{Notifier, NotifierFactory};

/// Resultado de un despliegue. `extra` lleva datos propios del proveedor
/// (p.ej. el id del certificado subido previamente).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployResult {
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl DeployResult {
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// Handle opaco asignado por el almacén de certificados del proveedor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub cert_id: String,
    pub cert_name: String,
}

#[async_trait]
pub trait Deployer: Send + Sync {
    /// Vincula el par certificado/clave al recurso destino del proveedor.
    async fn deploy(&self, ctx: &NodeContext, cert_pem: &str, key_pem: &str) -> Result<DeployResult, AdapterError>;
}

#[async_trait]
pub trait Uploader: Send + Sync {
    /// Registra el material en el almacén del proveedor.
    async fn upload(&self, ctx: &NodeContext, cert_pem: &str, key_pem: &str) -> Result<UploadResult, AdapterError>;
}

/// Construye deployers por nombre de proveedor.
pub trait DeployerFactory: Send + Sync {
    fn create_deployer(&self, provider: &str, config: &Value, logger: Arc<dyn LogSink>)
                       -> Result<Box<dyn Deployer>, AdapterError>;
}

/// Construye uploaders por nombre de proveedor. Los deployers que suben a
/// un almacén de certificados (p.ej. WAF sobre CAS) lo reciben al construirse.
pub trait UploaderFactory: Send + Sync {
    fn create_uploader(&self, provider: &str, config: &Value, logger: Arc<dyn LogSink>)
                       -> Result<Box<dyn Uploader>, AdapterError>;
}

/// Fábrica sin proveedores: toda creación falla como configuración
/// inválida. Valor por defecto del runner cuando no se inyecta un registro.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProviders;

impl DeployerFactory for NoProviders {
    fn create_deployer(&self, provider: &str, _config: &Value, _logger: Arc<dyn LogSink>)
                       -> Result<Box<dyn Deployer>, AdapterError> {
        Err(AdapterError::config(provider, "no deployer registry configured"))
    }
}

impl UploaderFactory for NoProviders {
    fn create_uploader(&self, provider: &str, _config: &Value, _logger: Arc<dyn LogSink>)
                       -> Result<Box<dyn Uploader>, AdapterError> {
        Err(AdapterError::config(provider, "no uploader registry configured"))
    }
}

impl NotifierFactory for NoProviders {
    fn create_notifier(&self, channel: &str, _config: &Value, _logger: Arc<dyn LogSink>)
                       -> Result<Box<dyn Notifier>, AdapterError> {
        Err(AdapterError::config(channel, "no notifier registry configured"))
    }
}
