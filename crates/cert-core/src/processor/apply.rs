//! Nodo `apply`: obtiene un certificado del emisor ACME.
//!
//! Se omite la emisión cuando el último output fue exitoso con la misma
//! configuración y el certificado vigente no vence dentro de
//! `skipBeforeExpiryDays`.
use std::sync::Arc;

use async_trait::async_trait;
use cert_domain::{parse_certificate_pem, ApplyNodeConfig, Certificate, CertificateSource, WorkflowNode, WorkflowOutput};
use chrono::{Duration, Utc};

use super::{certificate_of_node, fail, guarded, log_summary, prior_output, succeeded_output, NodeProcessor, ProcessorDeps};
use crate::context::NodeContext;
use crate::errors::WorkflowError;
use crate::hashing::config_hash;
use crate::logging::LogSink;
use crate::provider::{CertificateIssuer, IssueRequest};
use crate::repo::{CertificateRepository, OutputPersistence};

pub struct ApplyNode {
    node: WorkflowNode,
    outputs: OutputPersistence,
    certificates: Arc<dyn CertificateRepository>,
    issuer: Option<Arc<dyn CertificateIssuer>>,
    logger: Arc<dyn LogSink>,
}

impl ApplyNode {
    pub fn construct(node: WorkflowNode, deps: &ProcessorDeps, logger: Arc<dyn LogSink>)
                     -> Result<Box<dyn NodeProcessor>, WorkflowError> {
        Ok(Box::new(Self { node,
                           outputs: deps.outputs.clone(),
                           certificates: deps.certificates.clone(),
                           issuer: deps.issuer.clone(),
                           logger }))
    }

    /// `Some(motivo)` si la emisión puede omitirse.
    async fn skip_reason(&self,
                         ctx: &NodeContext,
                         config: &ApplyNodeConfig,
                         prior: Option<&WorkflowOutput>)
                         -> Result<Option<String>, WorkflowError> {
        let Some(prior) = prior.filter(|p| p.succeeded) else {
            return Ok(None);
        };
        if config_hash(&prior.node.config) != config_hash(&self.node.config) {
            return Ok(None);
        }
        let last = match certificate_of_node(ctx, self.certificates.as_ref(), &self.node.id).await {
            Ok(Some(cert)) => cert,
            Ok(None) => return Ok(None),
            Err(e) => return Err(fail(self.logger.as_ref(), "failed to query last certificate", e)),
        };
        let renew_at = Duration::try_days(config.skip_before_expiry_days)
            .and_then(|margin| Utc::now().checked_add_signed(margin))
            .ok_or_else(|| {
                fail(self.logger.as_ref(),
                     "invalid renewal margin",
                     WorkflowError::ConfigurationInvalid(format!("'skipBeforeExpiryDays' out of range: {}",
                                                                 config.skip_before_expiry_days)))
            })?;
        if last.expire_at > renew_at {
            return Ok(Some(format!("certificate {} is still valid until {}", last.id, last.expire_at)));
        }
        Ok(None)
    }

    async fn execute(&self, ctx: &NodeContext) -> Result<(), WorkflowError> {
        let logger = self.logger.as_ref();
        let config: ApplyNodeConfig = self.node
                                          .typed_config()
                                          .map_err(|e| fail(logger, "invalid apply node configuration", e))?;
        let issuer = self.issuer.clone().ok_or_else(|| {
                                             fail(logger,
                                                  "cannot apply certificate",
                                                  WorkflowError::ConfigurationInvalid("no certificate issuer configured".into()))
                                         })?;

        let prior = prior_output(ctx, &self.outputs, logger, &self.node).await?;
        if let Some(reason) = self.skip_reason(ctx, &config, prior.as_ref()).await? {
            logger.info(&format!("skip applying: {reason}"));
            return Ok(());
        }

        let request = IssueRequest { domains: config.domains.clone(),
                                     contact_email: config.contact_email.clone(),
                                     challenge_provider: config.provider.clone(),
                                     challenge_config: config.provider_config.clone(),
                                     key_algorithm: config.key_algorithm.clone() };
        logger.info(&format!("requesting certificate for {:?}", request.domains));
        let issued = ctx.guard("acme.Obtain", issuer.obtain(ctx, &request))
                        .await
                        .map_err(|e| fail(logger, "failed to obtain certificate", e))?;

        let parsed = parse_certificate_pem(&issued.certificate_pem)
            .map_err(|e| fail(logger, "issued certificate is not valid PEM", e))?;
        parsed.ensure_not_expired(Utc::now())
              .map_err(|e| fail(logger, "issued certificate is expired", e))?;
        let certificate =
            Certificate::from_pem(CertificateSource::Issued, &issued.certificate_pem, &issued.private_key_pem)
                .map_err(|e| fail(logger, "failed to build certificate from PEM", e))?;

        let output = succeeded_output(ctx, &self.node, prior.as_ref());
        let saved = guarded(ctx,
                            "repository.SaveWithCertificate",
                            self.outputs.save_with_certificate(output, Some(certificate)))
            .await
            .map_err(|e| fail(logger, "failed to save node output", e))?;
        logger.info(&format!("certificate issued: output={} certificate={} notAfter={}",
                             saved.id,
                             saved.certificate_id().unwrap_or_default(),
                             parsed.not_after));
        Ok(())
    }
}

#[async_trait]
impl NodeProcessor for ApplyNode {
    fn node(&self) -> &WorkflowNode {
        &self.node
    }

    async fn run(&self, ctx: &NodeContext) -> Result<(), WorkflowError> {
        self.logger.info("entering apply node");
        let result = self.execute(ctx).await;
        log_summary(self.logger.as_ref(), &self.node, &result);
        result
    }
}
