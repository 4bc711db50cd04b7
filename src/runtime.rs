//! Ensamblado del runner: repositorios (Postgres o memoria), registro de
//! proveedores y plazos tomados de `AppConfig`.
use std::sync::Arc;

use cert_adapters::ProviderRegistry;
use cert_core::{CertificateRepository, InMemoryCertificateRepository, InMemoryWorkflowOutputRepository,
                InMemoryWorkflowRunRepository, WorkflowError, WorkflowOutputRepository, WorkflowRunRepository,
                WorkflowRunner};
use cert_domain::{RunTrigger, Workflow, WorkflowRun};
use cert_persistence::{build_pool, DbConfig, PersistenceError, PgCertificateRepository, PgWorkflowOutputRepository,
                       PgWorkflowRunRepository, PoolProvider};
use log::info;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Postgres,
}

pub struct Runtime {
    runner: WorkflowRunner,
    backend: Backend,
}

impl Runtime {
    /// Postgres si hay `DATABASE_URL`, memoria en caso contrario.
    pub fn from_config(config: &AppConfig) -> Result<Self, PersistenceError> {
        match &config.database {
            Some(db) => Self::postgres(config, db),
            None => Ok(Self::in_memory(config)),
        }
    }

    pub fn in_memory(config: &AppConfig) -> Self {
        Self::assemble(config,
                       Arc::new(InMemoryWorkflowOutputRepository::new()),
                       Arc::new(InMemoryCertificateRepository::new()),
                       Arc::new(InMemoryWorkflowRunRepository::new()),
                       Backend::Memory)
    }

    pub fn postgres(config: &AppConfig, db: &DbConfig) -> Result<Self, PersistenceError> {
        let pool = build_pool(&db.url, db.min_connections, db.max_connections)?;
        Ok(Self::assemble(config,
                          Arc::new(PgWorkflowOutputRepository::new(PoolProvider::new(pool.clone()))),
                          Arc::new(PgCertificateRepository::new(PoolProvider::new(pool.clone()))),
                          Arc::new(PgWorkflowRunRepository::new(PoolProvider::new(pool))),
                          Backend::Postgres))
    }

    fn assemble(config: &AppConfig,
                outputs: Arc<dyn WorkflowOutputRepository>,
                certificates: Arc<dyn CertificateRepository>,
                runs: Arc<dyn WorkflowRunRepository>,
                backend: Backend)
                -> Self {
        let providers = Arc::new(ProviderRegistry::new(config.http_timeout));
        let runner = WorkflowRunner::builder(outputs, certificates, runs).with_providers(providers)
                                                                          .node_timeout(config.node_timeout)
                                                                          .build();
        info!("runtime ready (backend={backend:?}, node_timeout={:?})", config.node_timeout);
        Self { runner, backend }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn runner(&self) -> &WorkflowRunner {
        &self.runner
    }

    pub async fn run(&self, workflow: &Workflow, trigger: RunTrigger, cancel: CancellationToken)
                     -> Result<WorkflowRun, WorkflowError> {
        self.runner.run(workflow, trigger, cancel).await
    }
}
