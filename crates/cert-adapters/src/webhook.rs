//! Webhook genérico: despliegue y notificación por `POST` JSON.
//!
//! ```text
//! deploy:  {"domains": [...], "certificate": "<pem>", "privateKey": "<pem>"}
//! notify:  {"subject": "...", "message": "..."}
//! ```
//! Cualquier estado distinto de 2xx es un fallo de la petición.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cert_core::{AdapterError, DeployResult, Deployer, LogSink, NodeContext, Notifier};
use cert_domain::parse_certificate_pem;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const PROVIDER: &str = "webhook";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: String,
}

impl WebhookConfig {
    pub fn validate(&self) -> Result<(), AdapterError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(AdapterError::config(PROVIDER, "config `url` is required"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AdapterError::config(PROVIDER, format!("unsupported url scheme: {url}")));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeployPayload<'a> {
    domains: Vec<String>,
    certificate: &'a str,
    private_key: &'a str,
}

#[derive(Debug, Serialize)]
struct NotifyPayload<'a> {
    subject: &'a str,
    message: &'a str,
}

/// Cliente compartido por el deployer y el notifier.
#[derive(Debug, Clone)]
struct WebhookClient {
    http: Client,
    url: String,
}

impl WebhookClient {
    fn new(config: &WebhookConfig, timeout: Duration) -> Result<Self, AdapterError> {
        config.validate()?;
        let http = Client::builder().timeout(timeout)
                                    .build()
                                    .map_err(|e| {
                                        AdapterError::config(PROVIDER, format!("failed to create HTTP client: {e}"))
                                    })?;
        Ok(Self { http,
                  url: config.url.trim().to_string() })
    }

    async fn post<T: Serialize + Sync>(&self, ctx: &NodeContext, operation: &str, payload: &T)
                                       -> Result<u16, AdapterError> {
        ctx.guard(operation, async {
               let response = self.http
                                  .post(&self.url)
                                  .json(payload)
                                  .send()
                                  .await
                                  .map_err(|e| AdapterError::request(PROVIDER, operation, e))?;
               let status = response.status();
               if !status.is_success() {
                   let message = match response.text().await {
                       Ok(body) => format!("HTTP {status} - {body}"),
                       Err(e) => format!("HTTP {status} (failed to read response body: {e})"),
                   };
                   return Err(AdapterError::request(PROVIDER, operation, message));
               }
               debug!("{operation} -> {} ({status})", self.url);
               Ok(status.as_u16())
           })
           .await
    }
}

pub struct WebhookDeployer {
    client: WebhookClient,
    logger: Arc<dyn LogSink>,
}

impl WebhookDeployer {
    pub fn new(config: &WebhookConfig, timeout: Duration, logger: Arc<dyn LogSink>) -> Result<Self, AdapterError> {
        Ok(Self { client: WebhookClient::new(config, timeout)?,
                  logger })
    }
}

#[async_trait]
impl Deployer for WebhookDeployer {
    async fn deploy(&self, ctx: &NodeContext, cert_pem: &str, key_pem: &str) -> Result<DeployResult, AdapterError> {
        let domains = parse_certificate_pem(cert_pem).map(|p| p.domains())
                                                     .map_err(|e| AdapterError::certificate(PROVIDER, e))?;
        let payload = DeployPayload { domains,
                                      certificate: cert_pem,
                                      private_key: key_pem };
        let status = self.client.post(ctx, "webhook.Deploy", &payload).await?;
        self.logger.logt("webhook called", &json!({ "url": self.client.url, "status": status }));
        Ok(DeployResult::default().with("status", status))
    }
}

pub struct WebhookNotifier {
    client: WebhookClient,
    logger: Arc<dyn LogSink>,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig, timeout: Duration, logger: Arc<dyn LogSink>) -> Result<Self, AdapterError> {
        Ok(Self { client: WebhookClient::new(config, timeout)?,
                  logger })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, ctx: &NodeContext, subject: &str, message: &str) -> Result<(), AdapterError> {
        let status = self.client
                         .post(ctx, "webhook.Notify", &NotifyPayload { subject, message })
                         .await?;
        self.logger.logt("notification sent", &json!({ "url": self.client.url, "status": status }));
        Ok(())
    }
}
