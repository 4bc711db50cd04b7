//! Nodo `deploy`: vincula el certificado producido por otro nodo a un
//! recurso del proveedor.
//!
//! Orden de validación: configuración -> construcción del deployer (ambas
//! sin red) -> output previo -> certificado de entrada -> expiración. Un
//! certificado vencido nunca llega al adaptador.
use std::sync::Arc;

use async_trait::async_trait;
use cert_domain::{DeployNodeConfig, WorkflowNode, WorkflowOutput, CERTIFICATE_SLOT};
use chrono::Utc;
use serde_json::Value;

use super::{certificate_of_node, fail, guarded, log_summary, prior_output, succeeded_output, NodeProcessor, ProcessorDeps};
use crate::context::NodeContext;
use crate::errors::WorkflowError;
use crate::hashing::config_hash;
use crate::logging::LogSink;
use crate::provider::DeployerFactory;
use crate::repo::{CertificateRepository, OutputPersistence};

pub struct DeployNode {
    node: WorkflowNode,
    outputs: OutputPersistence,
    certificates: Arc<dyn CertificateRepository>,
    deployers: Arc<dyn DeployerFactory>,
    logger: Arc<dyn LogSink>,
}

impl DeployNode {
    pub fn construct(node: WorkflowNode, deps: &ProcessorDeps, logger: Arc<dyn LogSink>)
                     -> Result<Box<dyn NodeProcessor>, WorkflowError> {
        Ok(Box::new(Self { node,
                           outputs: deps.outputs.clone(),
                           certificates: deps.certificates.clone(),
                           deployers: deps.deployers.clone(),
                           logger }))
    }

    /// El último despliegue exitoso usó la misma configuración y el mismo
    /// certificado.
    fn already_deployed(&self, prior: Option<&WorkflowOutput>, certificate_id: &str) -> bool {
        prior.is_some_and(|p| {
                 p.succeeded
                 && p.certificate_id() == Some(certificate_id)
                 && config_hash(&p.node.config) == config_hash(&self.node.config)
             })
    }

    async fn execute(&self, ctx: &NodeContext) -> Result<(), WorkflowError> {
        let logger = self.logger.as_ref();
        let config: DeployNodeConfig = self.node
                                           .typed_config()
                                           .map_err(|e| fail(logger, "invalid deploy node configuration", e))?;
        let source_node = config.certificate_source_node()
                                .map_err(|m| fail(logger, "invalid deploy node configuration", WorkflowError::ConfigurationInvalid(m)))?;
        let deployer = self.deployers
                           .create_deployer(&config.provider, &config.provider_config, self.logger.clone())
                           .map_err(|e| fail(logger, "failed to initialize deployer", e))?;

        let prior = prior_output(ctx, &self.outputs, logger, &self.node).await?;

        let certificate = certificate_of_node(ctx, self.certificates.as_ref(), source_node)
            .await
            .map_err(|e| fail(logger, "failed to load input certificate", e))?
            .ok_or_else(|| {
                fail(logger,
                     "input certificate not available",
                     WorkflowError::RecordNotFound(format!("certificate produced by node '{source_node}'")))
            })?;
        let parsed = certificate.parse()
                                .map_err(|e| fail(logger, "failed to parse input certificate", e))?;
        parsed.ensure_not_expired(Utc::now())
              .map_err(|e| fail(logger, "certificate is expired", e))?;

        if config.skip_on_last_succeeded && self.already_deployed(prior.as_ref(), &certificate.id) {
            logger.info(&format!("skip deploying: certificate {} already deployed with the same configuration",
                                 certificate.id));
            return Ok(());
        }

        logger.info(&format!("deploying certificate {} via '{}'", certificate.id, config.provider));
        let operation = format!("{}.Deploy", config.provider);
        let result = ctx.guard(&operation,
                               deployer.deploy(ctx, &certificate.certificate, &certificate.private_key))
                        .await
                        .map_err(|e| fail(logger, "failed to deploy certificate", e))?;
        logger.logt("deploy result", &Value::Object(result.extra.clone()));

        let mut output = succeeded_output(ctx, &self.node, prior.as_ref());
        output.set_output_value(CERTIFICATE_SLOT, &certificate.id);
        let saved = guarded(ctx, "repository.Save", self.outputs.save(output))
            .await
            .map_err(|e| fail(logger, "failed to save node output", e))?;
        logger.info(&format!("deploy completed: output={}", saved.id));
        Ok(())
    }
}

#[async_trait]
impl NodeProcessor for DeployNode {
    fn node(&self) -> &WorkflowNode {
        &self.node
    }

    async fn run(&self, ctx: &NodeContext) -> Result<(), WorkflowError> {
        self.logger.info("entering deploy node");
        let result = self.execute(ctx).await;
        log_summary(self.logger.as_ref(), &self.node, &result);
        result
    }
}
