//! cert-adapters: proveedores concretos detrás de los contratos de
//! `cert_core::provider`.
//!
//! - `aliyun`: cliente OpenAPI firmado y los adaptadores CAS (uploader),
//!   WAF y DCDN (deployers).
//! - `webhook`: deployer y notifier genéricos por HTTP.
//! - `registry`: `ProviderRegistry`, que implementa las tres fábricas del
//!   núcleo.
//!
//! Toda configuración se valida al construir el adaptador, antes de
//! cualquier llamada de red.
use cert_core::AdapterError;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod aliyun;
pub mod registry;
pub mod webhook;

pub use aliyun::{AliyunCasUploader, AliyunDcdnDeployer, AliyunOpenApiClient, AliyunWafDeployer, OpenApiClient,
                 OpenApiError, OpenApiParams};
pub use registry::ProviderRegistry;
pub use webhook::{WebhookConfig, WebhookDeployer, WebhookNotifier};

/// Configuración JSON del nodo -> configuración tipada del proveedor.
pub(crate) fn parse_config<T: DeserializeOwned>(provider: &str, config: &Value) -> Result<T, AdapterError> {
    serde_json::from_value(config.clone()).map_err(|e| AdapterError::config(provider, e.to_string()))
}
