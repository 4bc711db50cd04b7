//! Backends en memoria (DashMap). Misma semántica de upsert que Postgres.
use async_trait::async_trait;
use cert_domain::{Certificate, WorkflowOutput, WorkflowRun};
use chrono::Utc;
use dashmap::DashMap;

use super::{new_record_id, CertificateRepository, WorkflowOutputRepository, WorkflowRunRepository};
use crate::errors::RepositoryError;

#[derive(Debug, Default)]
pub struct InMemoryWorkflowOutputRepository {
    records: DashMap<String, WorkflowOutput>,
}

impl InMemoryWorkflowOutputRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cantidad de outputs almacenados para un nodo.
    pub fn count_for_node(&self, node_id: &str) -> usize {
        self.records.iter().filter(|r| r.node_id == node_id).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl WorkflowOutputRepository for InMemoryWorkflowOutputRepository {
    async fn get_by_node_id(&self, node_id: &str) -> Result<WorkflowOutput, RepositoryError> {
        self.records
            .iter()
            .filter(|r| r.node_id == node_id)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .map(|r| r.value().clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("workflow output for node '{node_id}'")))
    }

    async fn save(&self, mut output: WorkflowOutput) -> Result<WorkflowOutput, RepositoryError> {
        let now = Utc::now();
        if output.id.is_empty() {
            output.id = new_record_id();
        }
        output.created_at = self.records
                                .get(&output.id)
                                .and_then(|existing| existing.created_at)
                                .or(output.created_at)
                                .or(Some(now));
        output.updated_at = Some(now);
        self.records.insert(output.id.clone(), output.clone());
        Ok(output)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCertificateRepository {
    records: DashMap<String, Certificate>,
}

impl InMemoryCertificateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CertificateRepository for InMemoryCertificateRepository {
    async fn get_by_id(&self, id: &str) -> Result<Certificate, RepositoryError> {
        self.records
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("certificate '{id}'")))
    }

    async fn get_by_workflow_node_id(&self, node_id: &str) -> Result<Certificate, RepositoryError> {
        self.records
            .iter()
            .filter(|r| r.workflow_node_id.as_deref() == Some(node_id))
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .map(|r| r.value().clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("certificate for node '{node_id}'")))
    }

    async fn save(&self, mut certificate: Certificate) -> Result<Certificate, RepositoryError> {
        let now = Utc::now();
        if certificate.id.is_empty() {
            certificate.id = new_record_id();
        }
        certificate.created_at = self.records
                                     .get(&certificate.id)
                                     .and_then(|existing| existing.created_at)
                                     .or(certificate.created_at)
                                     .or(Some(now));
        certificate.updated_at = Some(now);
        self.records.insert(certificate.id.clone(), certificate.clone());
        Ok(certificate)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWorkflowRunRepository {
    records: DashMap<String, WorkflowRun>,
}

impl InMemoryWorkflowRunRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowRunRepository for InMemoryWorkflowRunRepository {
    async fn get_by_id(&self, id: &str) -> Result<WorkflowRun, RepositoryError> {
        self.records
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("workflow run '{id}'")))
    }

    async fn save(&self, mut run: WorkflowRun) -> Result<WorkflowRun, RepositoryError> {
        let now = Utc::now();
        if run.id.is_empty() {
            run.id = new_record_id();
        }
        run.created_at = self.records
                             .get(&run.id)
                             .and_then(|existing| existing.created_at)
                             .or(run.created_at)
                             .or(Some(now));
        run.updated_at = Some(now);
        self.records.insert(run.id.clone(), run.clone());
        Ok(run)
    }
}
