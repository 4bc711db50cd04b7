//! Filas Diesel y su mapeo con las entidades de dominio.
use cert_domain::{Certificate, CertificateSource, RunStatus, RunTrigger, WorkflowOutput, WorkflowRun};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use crate::error::PersistenceError;
use crate::schema::{certificate, workflow_output, workflow_run};

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = workflow_output)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OutputRow {
    pub id: String,
    pub workflow_id: String,
    pub run_id: String,
    pub node_id: String,
    pub node: Value,
    pub outputs: Value,
    pub succeeded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutputRow {
    pub fn from_domain(output: &WorkflowOutput, now: DateTime<Utc>) -> Result<Self, PersistenceError> {
        Ok(Self { id: output.id.clone(),
                  workflow_id: output.workflow_id.clone(),
                  run_id: output.run_id.clone(),
                  node_id: output.node_id.clone(),
                  node: serde_json::to_value(&output.node)?,
                  outputs: serde_json::to_value(&output.outputs)?,
                  succeeded: output.succeeded,
                  created_at: output.created_at.unwrap_or(now),
                  updated_at: now })
    }

    pub fn into_domain(self) -> Result<WorkflowOutput, PersistenceError> {
        Ok(WorkflowOutput { id: self.id,
                            workflow_id: self.workflow_id,
                            run_id: self.run_id,
                            node_id: self.node_id,
                            node: serde_json::from_value(self.node)?,
                            outputs: serde_json::from_value(self.outputs)?,
                            succeeded: self.succeeded,
                            created_at: Some(self.created_at),
                            updated_at: Some(self.updated_at) })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = certificate)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CertificateRow {
    pub id: String,
    pub source: String,
    pub subject_alt_names: Value,
    pub serial_number: String,
    pub issuer_org: Option<String>,
    pub key_algorithm: String,
    pub certificate_pem: String,
    pub private_key: String,
    pub effect_at: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
    pub fingerprint: String,
    pub workflow_id: Option<String>,
    pub workflow_run_id: Option<String>,
    pub workflow_node_id: Option<String>,
    pub workflow_output_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CertificateRow {
    pub fn from_domain(cert: &Certificate, now: DateTime<Utc>) -> Result<Self, PersistenceError> {
        Ok(Self { id: cert.id.clone(),
                  source: cert.source.as_str().to_string(),
                  subject_alt_names: serde_json::to_value(&cert.subject_alt_names)?,
                  serial_number: cert.serial_number.clone(),
                  issuer_org: cert.issuer_org.clone(),
                  key_algorithm: cert.key_algorithm.clone(),
                  certificate_pem: cert.certificate.clone(),
                  private_key: cert.private_key.clone(),
                  effect_at: cert.effect_at,
                  expire_at: cert.expire_at,
                  fingerprint: cert.fingerprint.clone(),
                  workflow_id: cert.workflow_id.clone(),
                  workflow_run_id: cert.workflow_run_id.clone(),
                  workflow_node_id: cert.workflow_node_id.clone(),
                  workflow_output_id: cert.workflow_output_id.clone(),
                  created_at: cert.created_at.unwrap_or(now),
                  updated_at: now })
    }

    pub fn into_domain(self) -> Result<Certificate, PersistenceError> {
        let source = CertificateSource::parse(&self.source)
            .ok_or_else(|| PersistenceError::Mapping(format!("unknown certificate source '{}'", self.source)))?;
        Ok(Certificate { id: self.id,
                         source,
                         subject_alt_names: serde_json::from_value(self.subject_alt_names)?,
                         serial_number: self.serial_number,
                         issuer_org: self.issuer_org,
                         key_algorithm: self.key_algorithm,
                         certificate: self.certificate_pem,
                         private_key: self.private_key,
                         effect_at: self.effect_at,
                         expire_at: self.expire_at,
                         fingerprint: self.fingerprint,
                         workflow_id: self.workflow_id,
                         workflow_run_id: self.workflow_run_id,
                         workflow_node_id: self.workflow_node_id,
                         workflow_output_id: self.workflow_output_id,
                         created_at: Some(self.created_at),
                         updated_at: Some(self.updated_at) })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = workflow_run)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RunRow {
    pub id: String,
    pub workflow_id: String,
    pub status: String,
    pub trigger: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub logs: Value,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunRow {
    pub fn from_domain(run: &WorkflowRun, now: DateTime<Utc>) -> Result<Self, PersistenceError> {
        Ok(Self { id: run.id.clone(),
                  workflow_id: run.workflow_id.clone(),
                  status: run.status.as_str().to_string(),
                  trigger: run.trigger.as_str().to_string(),
                  started_at: run.started_at,
                  ended_at: run.ended_at,
                  logs: serde_json::to_value(&run.logs)?,
                  error: run.error.clone(),
                  created_at: run.created_at.unwrap_or(now),
                  updated_at: now })
    }

    pub fn into_domain(self) -> Result<WorkflowRun, PersistenceError> {
        let status = RunStatus::parse(&self.status)
            .ok_or_else(|| PersistenceError::Mapping(format!("unknown run status '{}'", self.status)))?;
        let trigger = RunTrigger::parse(&self.trigger)
            .ok_or_else(|| PersistenceError::Mapping(format!("unknown run trigger '{}'", self.trigger)))?;
        Ok(WorkflowRun { id: self.id,
                         workflow_id: self.workflow_id,
                         status,
                         trigger,
                         started_at: self.started_at,
                         ended_at: self.ended_at,
                         logs: serde_json::from_value(self.logs)?,
                         error: self.error,
                         created_at: Some(self.created_at),
                         updated_at: Some(self.updated_at) })
    }
}
