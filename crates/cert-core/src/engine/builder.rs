//! Builder para `WorkflowRunner`.
//!
//! `RunnerBuilderInit` exige los tres repositorios (outputs, certificados,
//! runs); `RunnerBuilder` agrega lo opcional (fábricas de proveedores,
//! emisor ACME, registro de procesadores, plazo por nodo).
//!
//! ```ignore
//! let runner = WorkflowRunner::builder(outputs, certificates, runs)
//!     .with_providers(registry)
//!     .node_timeout(Duration::from_secs(120))
//!     .build();
//! ```
use std::sync::Arc;
use std::time::Duration;

use crate::constants::DEFAULT_NODE_TIMEOUT_SECS;
use crate::engine::WorkflowRunner;
use crate::processor::{ProcessorDeps, ProcessorRegistry};
use crate::provider::{CertificateIssuer, DeployerFactory, NoProviders, NotifierFactory};
use crate::repo::{CertificateRepository, OutputPersistence, WorkflowOutputRepository, WorkflowRunRepository};

/// Estado inicial: repositorios obligatorios.
pub struct RunnerBuilderInit {
    pub outputs: Arc<dyn WorkflowOutputRepository>,
    pub certificates: Arc<dyn CertificateRepository>,
    pub runs: Arc<dyn WorkflowRunRepository>,
}

impl RunnerBuilderInit {
    /// Usa el mismo objeto como fábrica de deployers y de notifiers.
    pub fn with_providers<P>(self, providers: Arc<P>) -> RunnerBuilder
        where P: DeployerFactory + NotifierFactory + 'static
    {
        let deployers: Arc<dyn DeployerFactory> = providers.clone();
        let notifiers: Arc<dyn NotifierFactory> = providers;
        self.into_builder(deployers, notifiers)
    }

    /// Sin proveedores: los nodos `deploy` / `notify` fallarán como
    /// configuración inválida.
    pub fn without_providers(self) -> RunnerBuilder {
        let none = Arc::new(NoProviders);
        self.into_builder(none.clone(), none)
    }

    fn into_builder(self, deployers: Arc<dyn DeployerFactory>, notifiers: Arc<dyn NotifierFactory>) -> RunnerBuilder {
        RunnerBuilder { outputs: self.outputs,
                        certificates: self.certificates,
                        runs: self.runs,
                        deployers,
                        notifiers,
                        issuer: None,
                        registry: ProcessorRegistry::standard(),
                        node_timeout: Duration::from_secs(DEFAULT_NODE_TIMEOUT_SECS) }
    }
}

pub struct RunnerBuilder {
    outputs: Arc<dyn WorkflowOutputRepository>,
    certificates: Arc<dyn CertificateRepository>,
    runs: Arc<dyn WorkflowRunRepository>,
    deployers: Arc<dyn DeployerFactory>,
    notifiers: Arc<dyn NotifierFactory>,
    issuer: Option<Arc<dyn CertificateIssuer>>,
    registry: ProcessorRegistry,
    node_timeout: Duration,
}

impl RunnerBuilder {
    pub fn issuer(mut self, issuer: Arc<dyn CertificateIssuer>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn registry(mut self, registry: ProcessorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = timeout;
        self
    }

    pub fn build(self) -> WorkflowRunner {
        let deps = ProcessorDeps { outputs: OutputPersistence::new(self.outputs, self.certificates.clone()),
                                   certificates: self.certificates,
                                   deployers: self.deployers,
                                   notifiers: self.notifiers,
                                   issuer: self.issuer };
        WorkflowRunner::new(self.registry, deps, self.runs, self.node_timeout)
    }
}
