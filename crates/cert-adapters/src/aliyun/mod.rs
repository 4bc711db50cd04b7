//! Proveedores de Aliyun (CAS, WAF, DCDN) sobre su API OpenAPI estilo RPC.
//!
//! Cada producto se habla con un `OpenApiClient` ligado a un endpoint y a
//! una versión de API. Los adaptadores reciben el cliente por constructor
//! para poder probarse con un cliente falso.
use std::collections::BTreeMap;

use async_trait::async_trait;
use cert_core::{AdapterError, NodeContext};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub mod cas;
pub mod client;
pub mod dcdn;
pub mod waf;

pub use cas::{AliyunCasConfig, AliyunCasUploader};
pub use client::AliyunOpenApiClient;
pub use dcdn::{AliyunDcdnConfig, AliyunDcdnDeployer};
pub use waf::{AliyunWafConfig, AliyunWafDeployer};

/// Parámetros planos de una acción RPC. Los objetos anidados viajan ya
/// serializados a JSON.
pub type OpenApiParams = BTreeMap<String, String>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpenApiError {
    #[error("{code}: {message}")]
    Api { code: String, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("failed to sign request: {0}")]
    Signing(String),
}

#[async_trait]
pub trait OpenApiClient: Send + Sync {
    /// Invoca `action` y devuelve el cuerpo JSON de la respuesta.
    async fn call(&self, action: &str, params: &OpenApiParams) -> Result<Value, OpenApiError>;
}

/// Credenciales comunes a todos los productos.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliyunAccess {
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub access_key_secret: String,
}

impl AliyunAccess {
    pub fn validate(&self, provider: &str) -> Result<(), AdapterError> {
        if self.access_key_id.trim().is_empty() {
            return Err(AdapterError::config(provider, "config `accessKeyId` is required"));
        }
        if self.access_key_secret.trim().is_empty() {
            return Err(AdapterError::config(provider, "config `accessKeySecret` is required"));
        }
        Ok(())
    }
}

/// Región del servicio CAS asociada a una región de producto: CAS sólo
/// tiene un punto de acceso para China continental y otro internacional.
pub fn cas_region_for(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "cn-hangzhou"
    } else {
        "ap-southeast-1"
    }
}

pub(crate) fn params<const N: usize>(pairs: [(&str, String); N]) -> OpenApiParams {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Ejecuta `product.action` bajo el guard del contexto y envuelve el fallo
/// con proveedor y operación.
pub(crate) async fn invoke(ctx: &NodeContext,
                           client: &dyn OpenApiClient,
                           provider: &str,
                           product: &str,
                           action: &str,
                           params: &OpenApiParams)
                           -> Result<Value, AdapterError> {
    let operation = format!("{product}.{action}");
    ctx.guard(&operation, async {
           client.call(action, params)
                 .await
                 .map_err(|e| AdapterError::request(provider, &operation, e))
       })
       .await
}
