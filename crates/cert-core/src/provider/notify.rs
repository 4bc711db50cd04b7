use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::NodeContext;
use crate::errors::AdapterError;
use crate::logging::LogSink;

/// Canal de notificación (webhook, correo, ...).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, ctx: &NodeContext, subject: &str, message: &str) -> Result<(), AdapterError>;
}

pub trait NotifierFactory: Send + Sync {
    fn create_notifier(&self, channel: &str, config: &Value, logger: Arc<dyn LogSink>)
                       -> Result<Box<dyn Notifier>, AdapterError>;
}
