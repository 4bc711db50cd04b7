//! Contrato de persistencia de outputs consumido por los procesadores.
//!
//! `save_with_certificate` es una escritura en dos fases porque el almacén no
//! ofrece transacciones multi-registro:
//!
//! 1. Upsert del output (sin certificado vinculado).
//! 2. Inserción del certificado con back-references
//!    {workflowId, runId, nodeId, outputId}.
//! 3. Parche del slot `certificate` del output con el id nuevo y re-guardado.
//!
//! Estados de fallo parcial:
//! - Falla (2): el output queda persistido con el slot `certificate` vacío.
//!   Reintentar el nodo es seguro: el procesador reutiliza el id del output
//!   previo, por lo que no se crea un segundo output.
//! - Falla (3): el certificado existe y apunta al output, pero el output no lo
//!   referencia todavía. Un reintento del nodo vuelve a vincular.
//!
//! El certificado sólo se vincula al output después de persistirse.
use std::sync::Arc;

use cert_domain::{Certificate, WorkflowOutput, CERTIFICATE_SLOT};
use log::{debug, warn};

use super::{CertificateRepository, WorkflowOutputRepository};
use crate::errors::RepositoryError;

#[derive(Clone)]
pub struct OutputPersistence {
    outputs: Arc<dyn WorkflowOutputRepository>,
    certificates: Arc<dyn CertificateRepository>,
}

impl OutputPersistence {
    pub fn new(outputs: Arc<dyn WorkflowOutputRepository>, certificates: Arc<dyn CertificateRepository>) -> Self {
        Self { outputs, certificates }
    }

    pub fn certificates(&self) -> &Arc<dyn CertificateRepository> {
        &self.certificates
    }

    pub async fn get_by_node_id(&self, node_id: &str) -> Result<WorkflowOutput, RepositoryError> {
        self.outputs.get_by_node_id(node_id).await
    }

    /// Como `get_by_node_id`, pero la ausencia es `None`: primera ejecución.
    pub async fn find_by_node_id(&self, node_id: &str) -> Result<Option<WorkflowOutput>, RepositoryError> {
        match self.outputs.get_by_node_id(node_id).await {
            Ok(output) => Ok(Some(output)),
            Err(RepositoryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn save(&self, output: WorkflowOutput) -> Result<WorkflowOutput, RepositoryError> {
        self.outputs.save(output).await
    }

    pub async fn save_with_certificate(&self,
                                       output: WorkflowOutput,
                                       certificate: Option<Certificate>)
                                       -> Result<WorkflowOutput, RepositoryError> {
        let mut saved = self.outputs.save(output).await?;
        let Some(mut certificate) = certificate else {
            return Ok(saved);
        };

        certificate.workflow_id = Some(saved.workflow_id.clone());
        certificate.workflow_run_id = Some(saved.run_id.clone());
        certificate.workflow_node_id = Some(saved.node_id.clone());
        certificate.workflow_output_id = Some(saved.id.clone());
        let certificate = self.certificates.save(certificate).await.map_err(|e| {
                              warn!("output {} persisted without certificate linkage: {e}", saved.id);
                              e
                          })?;
        debug!("certificate {} saved for output {}", certificate.id, saved.id);

        saved.set_output_value(CERTIFICATE_SLOT, &certificate.id);
        self.outputs.save(saved).await.map_err(|e| {
                                          warn!("certificate {} saved but output link failed: {e}", certificate.id);
                                          e
                                      })
    }
}
