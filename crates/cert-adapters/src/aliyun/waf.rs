//! Deployer para Aliyun WAF 3.0.
//!
//! El certificado se sube primero a CAS; WAF lo referencia como
//! `{certId}-{regionCas}`.
//! - Sin dominio: se reemplaza el certificado HTTPS por defecto de la
//!   instancia (`DescribeDefaultHttps` + `ModifyDefaultHttps`).
//! - Con dominio: se modifica el listener del dominio protegido
//!   (`DescribeDomainDetail` + `ModifyDomain`), conservando versión TLS,
//!   TLSv1.3 y HTTPS forzado.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cert_core::provider::{normalize_wildcard_domain, WildcardStyle};
use cert_core::{AdapterError, DeployResult, Deployer, LogSink, NodeContext, Uploader, UploaderFactory};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::registry::ProviderRegistry;

use super::cas;
use super::{cas_region_for, invoke, AliyunAccess, AliyunOpenApiClient, OpenApiClient, OpenApiParams};

pub const PROVIDER: &str = "aliyun-waf";
const API_VERSION: &str = "2021-10-01";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliyunWafConfig {
    #[serde(flatten)]
    pub access: AliyunAccess,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub instance_id: String,
    /// Dominio protegido (admite comodín). Vacío = certificado por defecto.
    #[serde(default)]
    pub domain: Option<String>,
}

impl AliyunWafConfig {
    pub fn validate(&self) -> Result<(), AdapterError> {
        self.access.validate(PROVIDER)?;
        if self.region.trim().is_empty() {
            return Err(AdapterError::config(PROVIDER, "config `region` is required"));
        }
        if self.instance_id.trim().is_empty() {
            return Err(AdapterError::config(PROVIDER, "config `instanceId` is required"));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> String {
        format!("wafopenapi.{}.aliyuncs.com", self.region)
    }

    /// Configuración del uploader CAS asociado, en la región CAS.
    pub fn cas_config(&self) -> Value {
        json!({
            "accessKeyId": self.access.access_key_id,
            "accessKeySecret": self.access.access_key_secret,
            "region": cas_region_for(&self.region),
        })
    }

    /// Dominio listo para la API, sin comodín.
    pub fn target_domain(&self) -> Option<String> {
        self.domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| normalize_wildcard_domain(d, WildcardStyle::BareSuffix))
    }
}

pub struct AliyunWafDeployer {
    config: AliyunWafConfig,
    client: Arc<dyn OpenApiClient>,
    uploader: Box<dyn Uploader>,
    logger: Arc<dyn LogSink>,
}

impl AliyunWafDeployer {
    pub fn new(config: AliyunWafConfig, timeout: Duration, logger: Arc<dyn LogSink>) -> Result<Self, AdapterError> {
        Self::with_uploader_factory(config, timeout, &ProviderRegistry::new(timeout), logger)
    }

    /// Como `new`, pero el uploader CAS sale de `uploaders`.
    pub fn with_uploader_factory(config: AliyunWafConfig,
                                 timeout: Duration,
                                 uploaders: &dyn UploaderFactory,
                                 logger: Arc<dyn LogSink>)
                                 -> Result<Self, AdapterError> {
        config.validate()?;
        let client = AliyunOpenApiClient::new(&config.endpoint(),
                                              API_VERSION,
                                              &config.access.access_key_id,
                                              &config.access.access_key_secret,
                                              timeout).map_err(|e| AdapterError::config(PROVIDER, e.to_string()))?;
        let uploader = uploaders.create_uploader(cas::PROVIDER, &config.cas_config(), logger.clone())?;
        Self::with_clients(config, Arc::new(client), uploader, logger)
    }

    /// Construcción con colaboradores inyectados. Valida igual que `new`.
    pub fn with_clients(config: AliyunWafConfig,
                        client: Arc<dyn OpenApiClient>,
                        uploader: Box<dyn Uploader>,
                        logger: Arc<dyn LogSink>)
                        -> Result<Self, AdapterError> {
        config.validate()?;
        Ok(Self { config,
                  client,
                  uploader,
                  logger })
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        vec![("InstanceId", self.config.instance_id.clone()), ("RegionId", self.config.region.clone())]
    }

    async fn call(&self, ctx: &NodeContext, action: &str, extra: Vec<(&'static str, String)>)
                  -> Result<Value, AdapterError> {
        let mut request = OpenApiParams::new();
        for (k, v) in self.base_params().into_iter().chain(extra) {
            request.insert(k.to_string(), v);
        }
        let response = invoke(ctx, self.client.as_ref(), PROVIDER, "waf", action, &request).await?;
        self.logger.logt(&format!("waf.{action} completed"), &response);
        Ok(response)
    }

    async fn replace_default_certificate(&self, ctx: &NodeContext, cert_id: &str) -> Result<(), AdapterError> {
        let current = self.call(ctx, "DescribeDefaultHttps", vec![]).await?;
        let defaults = current.get("DefaultHttps");
        let (tls_version, enable_tls_v3) = tls_settings(defaults);
        self.call(ctx,
                  "ModifyDefaultHttps",
                  vec![("CertId", cert_id.to_string()),
                       ("TLSVersion", tls_version),
                       ("EnableTLSv3", enable_tls_v3.to_string())])
            .await?;
        Ok(())
    }

    async fn replace_domain_certificate(&self, ctx: &NodeContext, domain: &str, cert_id: &str)
                                        -> Result<(), AdapterError> {
        let detail = self.call(ctx, "DescribeDomainDetail", vec![("Domain", domain.to_string())]).await?;
        let listen = detail.get("Listen");
        let (tls_version, enable_tls_v3) = tls_settings(listen);
        let mut new_listen = json!({
            "CertId": cert_id,
            "TLSVersion": tls_version,
            "EnableTLSv3": enable_tls_v3,
        });
        if let Some(focus) = listen.and_then(|l| l.get("FocusHttps")).and_then(Value::as_bool) {
            new_listen["FocusHttps"] = Value::Bool(focus);
        }
        self.call(ctx,
                  "ModifyDomain",
                  vec![("Domain", domain.to_string()),
                       ("Listen", new_listen.to_string()),
                       ("Redirect", "{}".to_string())])
            .await?;
        Ok(())
    }
}

/// Versión TLS y TLSv1.3 vigentes, con los valores por defecto de WAF.
fn tls_settings(current: Option<&Value>) -> (String, bool) {
    let version = current.and_then(|c| c.get("TLSVersion"))
                         .and_then(Value::as_str)
                         .unwrap_or("tlsv1")
                         .to_string();
    let tls_v3 = current.and_then(|c| c.get("EnableTLSv3"))
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
    (version, tls_v3)
}

#[async_trait]
impl Deployer for AliyunWafDeployer {
    async fn deploy(&self, ctx: &NodeContext, cert_pem: &str, key_pem: &str) -> Result<DeployResult, AdapterError> {
        let uploaded = self.uploader.upload(ctx, cert_pem, key_pem).await?;
        self.logger.logt("certificate file uploaded",
                         &json!({ "certId": uploaded.cert_id, "certName": uploaded.cert_name }));
        let cert_id = format!("{}-{}", uploaded.cert_id, cas_region_for(&self.config.region));

        match self.config.target_domain() {
            None => self.replace_default_certificate(ctx, &cert_id).await?,
            Some(domain) => self.replace_domain_certificate(ctx, &domain, &cert_id).await?,
        }
        Ok(DeployResult::default().with("certId", cert_id))
    }
}
