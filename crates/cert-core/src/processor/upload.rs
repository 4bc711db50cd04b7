//! Nodo `upload`: registra material PEM suministrado por el usuario.
//!
//! - PEM que no parsea -> `CertificateInvalid`.
//! - `now > notAfter` -> `CertificateExpired`. Un certificado ya vencido se
//!   rechaza siempre, aunque algún proveedor lo tolere.
//! - Output + `Certificate{source: uploaded}` se guardan con
//!   `save_with_certificate`.
use std::sync::Arc;

use async_trait::async_trait;
use cert_domain::{parse_certificate_pem, Certificate, CertificateSource, UploadNodeConfig, WorkflowNode};
use chrono::Utc;

use super::{fail, guarded, log_summary, prior_output, succeeded_output, NodeProcessor, ProcessorDeps};
use crate::context::NodeContext;
use crate::errors::WorkflowError;
use crate::logging::LogSink;
use crate::repo::OutputPersistence;

pub struct UploadNode {
    node: WorkflowNode,
    outputs: OutputPersistence,
    logger: Arc<dyn LogSink>,
}

impl UploadNode {
    pub fn new(node: WorkflowNode, outputs: OutputPersistence, logger: Arc<dyn LogSink>) -> Self {
        Self { node, outputs, logger }
    }

    pub fn construct(node: WorkflowNode, deps: &ProcessorDeps, logger: Arc<dyn LogSink>)
                     -> Result<Box<dyn NodeProcessor>, WorkflowError> {
        Ok(Box::new(Self::new(node, deps.outputs.clone(), logger)))
    }

    async fn execute(&self, ctx: &NodeContext) -> Result<(), WorkflowError> {
        let logger = self.logger.as_ref();
        let config: UploadNodeConfig = self.node
                                           .typed_config()
                                           .map_err(|e| fail(logger, "invalid upload node configuration", e))?;

        let prior = prior_output(ctx, &self.outputs, logger, &self.node).await?;

        let parsed =
            parse_certificate_pem(&config.certificate).map_err(|e| fail(logger, "failed to parse certificate", e))?;
        parsed.ensure_not_expired(Utc::now())
              .map_err(|e| fail(logger, "certificate is expired", e))?;
        let certificate = Certificate::from_pem(CertificateSource::Uploaded, &config.certificate, &config.private_key)
            .map_err(|e| fail(logger, "failed to build certificate from PEM", e))?;
        logger.info(&format!("certificate parsed: domains={:?} notAfter={} fingerprint={}",
                             certificate.subject_alt_names, certificate.expire_at, certificate.fingerprint));

        let output = succeeded_output(ctx, &self.node, prior.as_ref());
        let saved = guarded(ctx,
                            "repository.SaveWithCertificate",
                            self.outputs.save_with_certificate(output, Some(certificate)))
            .await
            .map_err(|e| fail(logger, "failed to save node output", e))?;
        logger.info(&format!("upload completed: output={} certificate={}",
                             saved.id,
                             saved.certificate_id().unwrap_or_default()));
        Ok(())
    }
}

#[async_trait]
impl NodeProcessor for UploadNode {
    fn node(&self) -> &WorkflowNode {
        &self.node
    }

    async fn run(&self, ctx: &NodeContext) -> Result<(), WorkflowError> {
        self.logger.info("entering upload node");
        let result = self.execute(ctx).await;
        log_summary(self.logger.as_ref(), &self.node, &result);
        result
    }
}
