//! Registro de proveedores concretos: nombre de proveedor -> adaptador.
use std::sync::Arc;
use std::time::Duration;

use cert_core::{AdapterError, Deployer, DeployerFactory, LogSink, Notifier, NotifierFactory, Uploader, UploaderFactory};
use log::debug;
use serde_json::Value;

use crate::aliyun::{self, AliyunCasConfig, AliyunCasUploader, AliyunDcdnConfig, AliyunDcdnDeployer, AliyunWafConfig,
                    AliyunWafDeployer};
use crate::parse_config;
use crate::webhook::{self, WebhookConfig, WebhookDeployer, WebhookNotifier};

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    http_timeout: Duration,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }
}

impl ProviderRegistry {
    pub fn new(http_timeout: Duration) -> Self {
        Self { http_timeout }
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    pub fn deployers(&self) -> &'static [&'static str] {
        &[aliyun::waf::PROVIDER, aliyun::dcdn::PROVIDER, webhook::PROVIDER]
    }
}

impl DeployerFactory for ProviderRegistry {
    fn create_deployer(&self, provider: &str, config: &Value, logger: Arc<dyn LogSink>)
                       -> Result<Box<dyn Deployer>, AdapterError> {
        debug!("creating deployer '{provider}'");
        match provider {
            aliyun::waf::PROVIDER => {
                let config: AliyunWafConfig = parse_config(provider, config)?;
                Ok(Box::new(AliyunWafDeployer::with_uploader_factory(config, self.http_timeout, self, logger)?))
            }
            aliyun::dcdn::PROVIDER => {
                let config: AliyunDcdnConfig = parse_config(provider, config)?;
                Ok(Box::new(AliyunDcdnDeployer::new(config, self.http_timeout, logger)?))
            }
            webhook::PROVIDER => {
                let config: WebhookConfig = parse_config(provider, config)?;
                Ok(Box::new(WebhookDeployer::new(&config, self.http_timeout, logger)?))
            }
            other => Err(AdapterError::config(other, "unsupported deployer provider")),
        }
    }
}

impl UploaderFactory for ProviderRegistry {
    fn create_uploader(&self, provider: &str, config: &Value, logger: Arc<dyn LogSink>)
                       -> Result<Box<dyn Uploader>, AdapterError> {
        match provider {
            aliyun::cas::PROVIDER => {
                let config: AliyunCasConfig = parse_config(provider, config)?;
                Ok(Box::new(AliyunCasUploader::new(&config, self.http_timeout, logger)?))
            }
            other => Err(AdapterError::config(other, "unsupported uploader provider")),
        }
    }
}

impl NotifierFactory for ProviderRegistry {
    fn create_notifier(&self, channel: &str, config: &Value, logger: Arc<dyn LogSink>)
                       -> Result<Box<dyn Notifier>, AdapterError> {
        match channel {
            webhook::PROVIDER => {
                let config: WebhookConfig = parse_config(channel, config)?;
                Ok(Box::new(WebhookNotifier::new(&config, self.http_timeout, logger)?))
            }
            other => Err(AdapterError::config(other, "unsupported notification channel")),
        }
    }
}
