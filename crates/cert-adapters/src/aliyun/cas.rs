//! Uploader al servicio de certificados de Aliyun (CAS).
//!
//! Antes de subir se listan los certificados de usuario y se reutiliza el que
//! tenga la misma huella SHA-256, de modo que invocar dos veces con el mismo
//! material no crea duplicados.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cert_core::constants::CERT_NAME_PREFIX;
use cert_core::{AdapterError, LogSink, NodeContext, UploadResult, Uploader};
use cert_domain::parse_certificate_pem;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{invoke, params, AliyunAccess, AliyunOpenApiClient, OpenApiClient};

pub const PROVIDER: &str = "aliyun-cas";
const API_VERSION: &str = "2020-04-07";
const PAGE_SIZE: u64 = 50;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliyunCasConfig {
    #[serde(flatten)]
    pub access: AliyunAccess,
    #[serde(default)]
    pub region: String,
}

impl AliyunCasConfig {
    pub fn validate(&self) -> Result<(), AdapterError> {
        self.access.validate(PROVIDER)
    }

    /// Punto de acceso: uno para China continental y otro internacional.
    pub fn endpoint(&self) -> &'static str {
        if self.region.is_empty() || self.region.starts_with("cn-") {
            "cas.aliyuncs.com"
        } else {
            "cas.ap-southeast-1.aliyuncs.com"
        }
    }
}

pub struct AliyunCasUploader {
    client: Arc<dyn OpenApiClient>,
    logger: Arc<dyn LogSink>,
}

impl AliyunCasUploader {
    pub fn new(config: &AliyunCasConfig, timeout: Duration, logger: Arc<dyn LogSink>) -> Result<Self, AdapterError> {
        config.validate()?;
        let client = AliyunOpenApiClient::new(config.endpoint(),
                                              API_VERSION,
                                              &config.access.access_key_id,
                                              &config.access.access_key_secret,
                                              timeout).map_err(|e| AdapterError::config(PROVIDER, e.to_string()))?;
        Ok(Self::with_client(Arc::new(client), logger))
    }

    pub fn with_client(client: Arc<dyn OpenApiClient>, logger: Arc<dyn LogSink>) -> Self {
        Self { client, logger }
    }

    /// Busca un certificado ya subido con la huella dada.
    async fn find_uploaded(&self, ctx: &NodeContext, fingerprint: &str) -> Result<Option<UploadResult>, AdapterError> {
        let mut page = 1u64;
        loop {
            let request = params([("OrderType", "UPLOAD".to_string()),
                                  ("CurrentPage", page.to_string()),
                                  ("ShowSize", PAGE_SIZE.to_string())]);
            let response =
                invoke(ctx, self.client.as_ref(), PROVIDER, "cas", "ListUserCertificateOrder", &request).await?;
            let entries = response.get("CertificateOrderList")
                                  .and_then(Value::as_array)
                                  .cloned()
                                  .unwrap_or_default();
            if let Some(found) = entries.iter().find(|e| same_fingerprint(e, fingerprint)) {
                return Ok(Some(UploadResult { cert_id: id_of(found, "CertificateId"),
                                              cert_name: found.get("Name")
                                                              .and_then(Value::as_str)
                                                              .unwrap_or_default()
                                                              .to_string() }));
            }
            let total = response.get("TotalCount").and_then(Value::as_u64).unwrap_or(0);
            if entries.is_empty() || page * PAGE_SIZE >= total {
                return Ok(None);
            }
            page += 1;
        }
    }
}

fn normalize_fingerprint(raw: &str) -> String {
    raw.chars().filter(|c| *c != ':').collect::<String>().to_ascii_lowercase()
}

fn same_fingerprint(entry: &Value, fingerprint: &str) -> bool {
    entry.get("Fingerprint")
         .and_then(Value::as_str)
         .is_some_and(|f| normalize_fingerprint(f) == fingerprint)
}

/// Los ids de CAS llegan como número o como cadena según la acción.
fn id_of(value: &Value, field: &str) -> String {
    match value.get(field) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

#[async_trait]
impl Uploader for AliyunCasUploader {
    async fn upload(&self, ctx: &NodeContext, cert_pem: &str, key_pem: &str) -> Result<UploadResult, AdapterError> {
        let parsed = parse_certificate_pem(cert_pem).map_err(|e| AdapterError::certificate(PROVIDER, e))?;
        let fingerprint = normalize_fingerprint(&parsed.fingerprint);

        if let Some(existing) = self.find_uploaded(ctx, &fingerprint).await? {
            self.logger.logt("certificate already uploaded",
                             &json!({ "certId": existing.cert_id, "certName": existing.cert_name }));
            return Ok(existing);
        }

        let cert_name = format!("{CERT_NAME_PREFIX}-{}", Utc::now().timestamp_millis());
        let request = params([("Name", cert_name.clone()),
                              ("Cert", cert_pem.to_string()),
                              ("Key", key_pem.to_string())]);
        let response = invoke(ctx, self.client.as_ref(), PROVIDER, "cas", "UploadUserCertificate", &request).await?;
        self.logger.logt("certificate uploaded", &response);

        let cert_id = id_of(&response, "CertId");
        if cert_id.is_empty() {
            return Err(AdapterError::request(PROVIDER, "cas.UploadUserCertificate", "response without CertId"));
        }
        Ok(UploadResult { cert_id, cert_name })
    }
}
