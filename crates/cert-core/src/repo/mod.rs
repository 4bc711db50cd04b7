//! Repositorios de outputs, certificados y runs.
//!
//! Los traits son la frontera con la capa de persistencia: el núcleo trae
//! backends en memoria (`memory`) y `cert-persistence` los implementa sobre
//! Postgres. El contrato compuesto de outputs (`OutputPersistence`) se
//! implementa una única vez encima de los traits, por lo que ambos backends
//! comparten exactamente la misma escritura en dos fases.
use async_trait::async_trait;
use cert_domain::{Certificate, WorkflowOutput, WorkflowRun};

use crate::errors::RepositoryError;

pub mod memory;
pub mod output;

pub use memory::{InMemoryCertificateRepository, InMemoryWorkflowOutputRepository, InMemoryWorkflowRunRepository};
pub use output::OutputPersistence;

#[async_trait]
pub trait WorkflowOutputRepository: Send + Sync {
    /// Output más reciente del nodo. `RepositoryError::NotFound` si el nodo
    /// nunca se ejecutó.
    async fn get_by_node_id(&self, node_id: &str) -> Result<WorkflowOutput, RepositoryError>;

    /// Upsert por id. Asigna id y `created_at` en la primera inserción y
    /// sella `updated_at` siempre.
    async fn save(&self, output: WorkflowOutput) -> Result<WorkflowOutput, RepositoryError>;
}

#[async_trait]
pub trait CertificateRepository: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Certificate, RepositoryError>;

    /// Certificado más reciente producido por un nodo.
    async fn get_by_workflow_node_id(&self, node_id: &str) -> Result<Certificate, RepositoryError>;

    async fn save(&self, certificate: Certificate) -> Result<Certificate, RepositoryError>;
}

#[async_trait]
pub trait WorkflowRunRepository: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<WorkflowRun, RepositoryError>;

    async fn save(&self, run: WorkflowRun) -> Result<WorkflowRun, RepositoryError>;
}

/// Id nuevo para registros que aún no lo tienen.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
