use std::sync::Arc;

use async_trait::async_trait;
use cert_domain::{NotifyNodeConfig, WorkflowNode};

use super::{fail, guarded, log_summary, prior_output, succeeded_output, NodeProcessor, ProcessorDeps};
use crate::context::NodeContext;
use crate::errors::WorkflowError;
use crate::logging::LogSink;
use crate::provider::NotifierFactory;
use crate::repo::OutputPersistence;

/// Nodo `notify`: envía un mensaje por el canal configurado.
pub struct NotifyNode {
    node: WorkflowNode,
    outputs: OutputPersistence,
    notifiers: Arc<dyn NotifierFactory>,
    logger: Arc<dyn LogSink>,
}

impl NotifyNode {
    pub fn construct(node: WorkflowNode, deps: &ProcessorDeps, logger: Arc<dyn LogSink>)
                     -> Result<Box<dyn NodeProcessor>, WorkflowError> {
        Ok(Box::new(Self { node,
                           outputs: deps.outputs.clone(),
                           notifiers: deps.notifiers.clone(),
                           logger }))
    }

    async fn execute(&self, ctx: &NodeContext) -> Result<(), WorkflowError> {
        let logger = self.logger.as_ref();
        let config: NotifyNodeConfig = self.node
                                           .typed_config()
                                           .map_err(|e| fail(logger, "invalid notify node configuration", e))?;
        let notifier = self.notifiers
                           .create_notifier(&config.channel, &config.channel_config, self.logger.clone())
                           .map_err(|e| fail(logger, "failed to initialize notifier", e))?;

        let prior = prior_output(ctx, &self.outputs, logger, &self.node).await?;

        let operation = format!("{}.Notify", config.channel);
        ctx.guard(&operation, notifier.notify(ctx, &config.subject, &config.message))
           .await
           .map_err(|e| fail(logger, "failed to send notification", e))?;

        let output = succeeded_output(ctx, &self.node, prior.as_ref());
        guarded(ctx, "repository.Save", self.outputs.save(output))
            .await
            .map_err(|e| fail(logger, "failed to save node output", e))?;
        logger.info(&format!("notification sent via '{}'", config.channel));
        Ok(())
    }
}

#[async_trait]
impl NodeProcessor for NotifyNode {
    fn node(&self) -> &WorkflowNode {
        &self.node
    }

    async fn run(&self, ctx: &NodeContext) -> Result<(), WorkflowError> {
        self.logger.info("entering notify node");
        let result = self.execute(ctx).await;
        log_summary(self.logger.as_ref(), &self.node, &result);
        result
    }
}
