use std::sync::Arc;

use async_trait::async_trait;
use cert_domain::{NodeType, WorkflowNode};

use super::{NodeProcessor, ProcessorDeps};
use crate::context::NodeContext;
use crate::errors::WorkflowError;
use crate::logging::LogSink;

/// Nodos `start` / `end`: sólo dejan constancia en el log, no persisten
/// outputs.
pub struct ControlNode {
    node: WorkflowNode,
    logger: Arc<dyn LogSink>,
}

impl ControlNode {
    pub fn construct(node: WorkflowNode, _deps: &ProcessorDeps, logger: Arc<dyn LogSink>)
                     -> Result<Box<dyn NodeProcessor>, WorkflowError> {
        Ok(Box::new(Self { node, logger }))
    }
}

#[async_trait]
impl NodeProcessor for ControlNode {
    fn node(&self) -> &WorkflowNode {
        &self.node
    }

    async fn run(&self, ctx: &NodeContext) -> Result<(), WorkflowError> {
        match self.node.node_type {
            NodeType::Start => self.logger.info(&format!("workflow {} started (run {})", ctx.workflow_id, ctx.run_id)),
            _ => self.logger.info(&format!("workflow {} finished (run {})", ctx.workflow_id, ctx.run_id)),
        }
        Ok(())
    }
}
