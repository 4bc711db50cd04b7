//! Ejecución secuencial de un workflow.
//!
//! - Crea el run (`pending`), lo pasa a `running` y ejecuta los nodos en
//!   orden, cada uno con su `NodeLogger` y un contexto hijo con plazo.
//! - Se detiene en el primer fallo: los nodos posteriores no se ejecutan.
//! - Estado final: `succeeded`, `canceled` (si el error es `Canceled`) o
//!   `failed` con el texto del error. Los logs de todos los nodos ejecutados
//!   (incluido el que falló) se adjuntan al run persistido.
//!
//! Sólo los errores al persistir el propio run se devuelven como `Err`.
use std::sync::Arc;
use std::time::Duration;

use cert_domain::{RunStatus, RunTrigger, Workflow, WorkflowNode, WorkflowRun};
use chrono::Utc;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::context::NodeContext;
use crate::engine::builder::RunnerBuilderInit;
use crate::errors::{ErrorKind, WorkflowError};
use crate::logging::{LogSink, RunLogBook};
use crate::processor::{ProcessorDeps, ProcessorRegistry};
use crate::repo::{CertificateRepository, WorkflowOutputRepository, WorkflowRunRepository};

pub struct WorkflowRunner {
    registry: ProcessorRegistry,
    deps: ProcessorDeps,
    runs: Arc<dyn WorkflowRunRepository>,
    node_timeout: Duration,
}

impl WorkflowRunner {
    pub fn new(registry: ProcessorRegistry,
               deps: ProcessorDeps,
               runs: Arc<dyn WorkflowRunRepository>,
               node_timeout: Duration)
               -> Self {
        Self { registry,
               deps,
               runs,
               node_timeout }
    }

    pub fn builder(outputs: Arc<dyn WorkflowOutputRepository>,
                   certificates: Arc<dyn CertificateRepository>,
                   runs: Arc<dyn WorkflowRunRepository>)
                   -> RunnerBuilderInit {
        RunnerBuilderInit { outputs, certificates, runs }
    }

    pub fn deps(&self) -> &ProcessorDeps {
        &self.deps
    }

    pub async fn run(&self,
                     workflow: &Workflow,
                     trigger: RunTrigger,
                     cancel: CancellationToken)
                     -> Result<WorkflowRun, WorkflowError> {
        let mut run = self.runs.save(WorkflowRun::new(&workflow.id, trigger)).await?;
        let root = NodeContext::new(&workflow.id, &run.id).with_cancellation(cancel);
        if root.is_canceled() {
            run.transition(RunStatus::Canceled, Utc::now())?;
            run.error = Some("run canceled before start".into());
            return Ok(self.runs.save(run).await?);
        }
        run.transition(RunStatus::Running, Utc::now())?;
        run = self.runs.save(run).await?;
        info!("run {} started for workflow {} ({} nodes)", run.id, workflow.id, workflow.nodes.len());

        let book = RunLogBook::new();
        let mut failure: Option<(&WorkflowNode, WorkflowError)> = None;
        for node in &workflow.nodes {
            let logger = book.logger_for(node);
            if root.is_canceled() {
                let err = WorkflowError::Canceled(format!("run canceled before node '{}'", node.id));
                logger.error("node skipped", &err);
                failure = Some((node, err));
                break;
            }
            let ctx = root.child().with_timeout(self.node_timeout);
            let result = match self.registry.create(node.clone(), &self.deps, logger.clone()) {
                Ok(processor) => processor.run(&ctx).await,
                Err(e) => {
                    logger.error("failed to create node processor", &e);
                    Err(e)
                }
            };
            if let Err(e) = result {
                warn!("run {}: node '{}' failed: {e}", run.id, node.id);
                failure = Some((node, e));
                break;
            }
        }

        let status = match &failure {
            None => RunStatus::Succeeded,
            Some((_, e)) if e.kind() == ErrorKind::Canceled => RunStatus::Canceled,
            Some(_) => RunStatus::Failed,
        };
        run.error = failure.map(|(node, e)| format!("node '{}' ({}): {e}", node.name, node.id));
        run.logs = book.snapshot();
        run.transition(status, Utc::now())?;
        info!("run {} finished with status {}", run.id, run.status);
        Ok(self.runs.save(run).await?)
    }
}
