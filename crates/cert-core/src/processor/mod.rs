//! Procesadores de nodo: la unidad de trabajo polimórfica por tipo de nodo.
//!
//! Algoritmo compartido:
//! 1. Entrada de inicio en el log del nodo.
//! 2. Configuración tipada; campos ausentes o malformados fallan como
//!    `ConfigurationInvalid` antes de cualquier llamada externa.
//! 3. Búsqueda del output previo por `nodeId`; su ausencia indica primera
//!    ejecución y su presencia aporta el id a reutilizar.
//! 4. Acción propia del nodo. Cada fallo se registra (mensaje + error crudo)
//!    y se devuelve de inmediato; no se persiste output parcial.
//! 5. Construcción y guardado del `WorkflowOutput`.
//! 6. Entrada de resumen (éxito o fallo).
//!
//! Un procesador nunca modifica el estado del `WorkflowRun`: sólo devuelve
//! el error al orquestador.
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use cert_domain::{Certificate, WorkflowNode, WorkflowOutput};

use crate::context::NodeContext;
use crate::errors::{RepositoryError, WorkflowError};
use crate::logging::LogSink;
use crate::provider::{CertificateIssuer, DeployerFactory, NotifierFactory};
use crate::repo::{CertificateRepository, OutputPersistence};

pub mod apply;
pub mod control;
pub mod deploy;
pub mod notify;
pub mod registry;
pub mod upload;

pub use apply::ApplyNode;
pub use control::ControlNode;
pub use deploy::DeployNode;
pub use notify::NotifyNode;
pub use registry::{ProcessorConstructor, ProcessorRegistry};
pub use upload::UploadNode;

#[async_trait]
pub trait NodeProcessor: Send + Sync {
    fn node(&self) -> &WorkflowNode;

    async fn run(&self, ctx: &NodeContext) -> Result<(), WorkflowError>;
}

/// Dependencias explícitas de los procesadores (sin singletons globales).
#[derive(Clone)]
pub struct ProcessorDeps {
    pub outputs: OutputPersistence,
    pub certificates: Arc<dyn CertificateRepository>,
    pub deployers: Arc<dyn DeployerFactory>,
    pub notifiers: Arc<dyn NotifierFactory>,
    pub issuer: Option<Arc<dyn CertificateIssuer>>,
}

/// Registra el fallo en el log del nodo y lo devuelve convertido.
pub(crate) fn fail<E: Into<WorkflowError>>(logger: &dyn LogSink, message: &str, err: E) -> WorkflowError {
    let err = err.into();
    logger.error(message, &err);
    err
}

/// Entrada de resumen final (paso 6).
pub(crate) fn log_summary(logger: &dyn LogSink, node: &WorkflowNode, result: &Result<(), WorkflowError>) {
    match result {
        Ok(()) => logger.info(&format!("node '{}' ({}) completed", node.name, node.node_type)),
        Err(e) => logger.add_output(cert_domain::LogLevel::Error,
                                    &format!("node '{}' ({}) failed: {:?}", node.name, node.node_type, e.kind()),
                                    None),
    }
}

/// Ejecuta una operación de repositorio bajo la cancelación del contexto.
pub(crate) async fn guarded<T, F>(ctx: &NodeContext, operation: &str, fut: F) -> Result<T, WorkflowError>
    where F: Future<Output = Result<T, RepositoryError>>
{
    ctx.guard(operation, async { fut.await.map_err(WorkflowError::from) }).await
}

/// Paso 3: output previo del nodo, si existe.
pub(crate) async fn prior_output(ctx: &NodeContext,
                                 outputs: &OutputPersistence,
                                 logger: &dyn LogSink,
                                 node: &WorkflowNode)
                                 -> Result<Option<WorkflowOutput>, WorkflowError> {
    let prior = guarded(ctx, "repository.GetByNodeId", outputs.find_by_node_id(&node.id))
        .await
        .map_err(|e| fail(logger, "failed to query last output", e))?;
    if let Some(last) = &prior {
        logger.add_output(cert_domain::LogLevel::Debug,
                          &format!("found previous output {} (succeeded={})", last.id, last.succeeded),
                          None);
    }
    Ok(prior)
}

/// Paso 5: output exitoso que reutiliza el id del previo (sobrescritura
/// idempotente).
pub(crate) fn succeeded_output(ctx: &NodeContext, node: &WorkflowNode, prior: Option<&WorkflowOutput>) -> WorkflowOutput {
    let mut output = WorkflowOutput::new(&ctx.workflow_id, &ctx.run_id, node);
    output.succeeded = true;
    if let Some(prior) = prior {
        output.id = prior.id.clone();
        output.created_at = prior.created_at;
    }
    output
}

/// Certificado más reciente producido por `node_id`, si existe.
pub(crate) async fn certificate_of_node(ctx: &NodeContext,
                                        certificates: &dyn CertificateRepository,
                                        node_id: &str)
                                        -> Result<Option<Certificate>, WorkflowError> {
    guarded(ctx, "repository.GetCertificateByNodeId", async {
        match certificates.get_by_workflow_node_id(node_id).await {
            Ok(cert) => Ok(Some(cert)),
            Err(RepositoryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    })
    .await
}
