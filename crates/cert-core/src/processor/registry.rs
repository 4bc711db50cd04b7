//! Mapa tipo de nodo -> constructor de procesador.
use std::collections::HashMap;
use std::sync::Arc;

use cert_domain::{NodeType, WorkflowNode};

use super::{ApplyNode, ControlNode, DeployNode, NodeProcessor, NotifyNode, ProcessorDeps, UploadNode};
use crate::errors::WorkflowError;
use crate::logging::LogSink;

pub type ProcessorConstructor =
    fn(WorkflowNode, &ProcessorDeps, Arc<dyn LogSink>) -> Result<Box<dyn NodeProcessor>, WorkflowError>;

#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    constructors: HashMap<NodeType, ProcessorConstructor>,
}

impl ProcessorRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registro con todos los tipos de nodo conocidos.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(NodeType::Start, ControlNode::construct)
                .register(NodeType::End, ControlNode::construct)
                .register(NodeType::Apply, ApplyNode::construct)
                .register(NodeType::Upload, UploadNode::construct)
                .register(NodeType::Deploy, DeployNode::construct)
                .register(NodeType::Notify, NotifyNode::construct);
        registry
    }

    pub fn register(&mut self, node_type: NodeType, constructor: ProcessorConstructor) -> &mut Self {
        self.constructors.insert(node_type, constructor);
        self
    }

    pub fn supports(&self, node_type: NodeType) -> bool {
        self.constructors.contains_key(&node_type)
    }

    pub fn create(&self, node: WorkflowNode, deps: &ProcessorDeps, logger: Arc<dyn LogSink>)
                  -> Result<Box<dyn NodeProcessor>, WorkflowError> {
        match self.constructors.get(&node.node_type) {
            Some(constructor) => constructor(node, deps, logger),
            None => Err(WorkflowError::ConfigurationInvalid(format!("no processor registered for node type '{}'",
                                                                    node.node_type))),
        }
    }
}
