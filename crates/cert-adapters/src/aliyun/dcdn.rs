//! Deployer para Aliyun DCDN: fija el certificado de un dominio acelerado
//! con `SetDcdnDomainSSLCertificate` enviando el PEM directamente.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cert_core::constants::CERT_NAME_PREFIX;
use cert_core::provider::{normalize_wildcard_domain, WildcardStyle};
use cert_core::{AdapterError, DeployResult, Deployer, LogSink, NodeContext};
use chrono::Utc;
use serde::Deserialize;

use super::{invoke, params, AliyunAccess, AliyunOpenApiClient, OpenApiClient};

pub const PROVIDER: &str = "aliyun-dcdn";
const API_VERSION: &str = "2018-01-15";
const ENDPOINT: &str = "dcdn.aliyuncs.com";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliyunDcdnConfig {
    #[serde(flatten)]
    pub access: AliyunAccess,
    /// Dominio acelerado (admite comodín).
    #[serde(default)]
    pub domain: String,
}

impl AliyunDcdnConfig {
    pub fn validate(&self) -> Result<(), AdapterError> {
        self.access.validate(PROVIDER)?;
        if self.domain.trim().is_empty() {
            return Err(AdapterError::config(PROVIDER, "config `domain` is required"));
        }
        Ok(())
    }

    /// DCDN espera `.example.com` para `*.example.com`.
    pub fn domain_name(&self) -> String {
        normalize_wildcard_domain(&self.domain, WildcardStyle::LeadingDot)
    }
}

pub struct AliyunDcdnDeployer {
    config: AliyunDcdnConfig,
    client: Arc<dyn OpenApiClient>,
    logger: Arc<dyn LogSink>,
}

impl AliyunDcdnDeployer {
    pub fn new(config: AliyunDcdnConfig, timeout: Duration, logger: Arc<dyn LogSink>) -> Result<Self, AdapterError> {
        config.validate()?;
        let client = AliyunOpenApiClient::new(ENDPOINT,
                                              API_VERSION,
                                              &config.access.access_key_id,
                                              &config.access.access_key_secret,
                                              timeout).map_err(|e| AdapterError::config(PROVIDER, e.to_string()))?;
        Self::with_client(config, Arc::new(client), logger)
    }

    pub fn with_client(config: AliyunDcdnConfig, client: Arc<dyn OpenApiClient>, logger: Arc<dyn LogSink>)
                       -> Result<Self, AdapterError> {
        config.validate()?;
        Ok(Self { config, client, logger })
    }
}

#[async_trait]
impl Deployer for AliyunDcdnDeployer {
    async fn deploy(&self, ctx: &NodeContext, cert_pem: &str, key_pem: &str) -> Result<DeployResult, AdapterError> {
        let domain = self.config.domain_name();
        let cert_name = format!("{CERT_NAME_PREFIX}-{}", Utc::now().timestamp_millis());
        let request = params([("DomainName", domain.clone()),
                              ("CertName", cert_name.clone()),
                              ("CertType", "upload".to_string()),
                              ("SSLProtocol", "on".to_string()),
                              ("SSLPub", cert_pem.to_string()),
                              ("SSLPri", key_pem.to_string())]);
        let response =
            invoke(ctx, self.client.as_ref(), PROVIDER, "dcdn", "SetDcdnDomainSSLCertificate", &request).await?;
        self.logger.logt("dcdn domain certificate set", &response);
        Ok(DeployResult::default().with("domain", domain).with("certName", cert_name))
    }
}
