use std::sync::Arc;

use async_trait::async_trait;
use cert_core::{CertificateRepository, RepositoryError, WorkflowOutputRepository, WorkflowRunRepository};
use cert_core::repo::new_record_id;
use cert_domain::{Certificate, WorkflowOutput, WorkflowRun};
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use log::debug;

use super::rows::{CertificateRow, OutputRow, RunRow};
use super::{run_blocking, ConnectionProvider};
use crate::schema::{certificate, workflow_output, workflow_run};

fn not_found(what: String) -> RepositoryError {
    RepositoryError::NotFound(what)
}

pub struct PgWorkflowOutputRepository<P: ConnectionProvider> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> PgWorkflowOutputRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider: Arc::new(provider) }
    }
}

#[async_trait]
impl<P: ConnectionProvider> WorkflowOutputRepository for PgWorkflowOutputRepository<P> {
    async fn get_by_node_id(&self, node_id: &str) -> Result<WorkflowOutput, RepositoryError> {
        let key = node_id.to_string();
        let row = run_blocking(&self.provider, move |conn| {
                      Ok(workflow_output::table.filter(workflow_output::node_id.eq(&key))
                                               .order((workflow_output::created_at.desc(), workflow_output::id.desc()))
                                               .select(OutputRow::as_select())
                                               .first(conn)
                                               .optional()?)
                  }).await?;
        match row {
            Some(row) => row.into_domain().map_err(RepositoryError::from),
            None => Err(not_found(format!("workflow output for node '{node_id}'"))),
        }
    }

    async fn save(&self, mut output: WorkflowOutput) -> Result<WorkflowOutput, RepositoryError> {
        if output.id.is_empty() {
            output.id = new_record_id();
        }
        let row = OutputRow::from_domain(&output, Utc::now())?;
        debug!("upsert workflow_output id={} node={}", row.id, row.node_id);
        let saved = run_blocking(&self.provider, move |conn| {
                        Ok(diesel::insert_into(workflow_output::table)
                            .values(&row)
                            .on_conflict(workflow_output::id)
                            .do_update()
                            .set((workflow_output::workflow_id.eq(excluded(workflow_output::workflow_id)),
                                  workflow_output::run_id.eq(excluded(workflow_output::run_id)),
                                  workflow_output::node_id.eq(excluded(workflow_output::node_id)),
                                  workflow_output::node.eq(excluded(workflow_output::node)),
                                  workflow_output::outputs.eq(excluded(workflow_output::outputs)),
                                  workflow_output::succeeded.eq(excluded(workflow_output::succeeded)),
                                  workflow_output::updated_at.eq(excluded(workflow_output::updated_at))))
                            .returning(OutputRow::as_returning())
                            .get_result(conn)?)
                    }).await?;
        saved.into_domain().map_err(RepositoryError::from)
    }
}

pub struct PgCertificateRepository<P: ConnectionProvider> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> PgCertificateRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider: Arc::new(provider) }
    }
}

#[async_trait]
impl<P: ConnectionProvider> CertificateRepository for PgCertificateRepository<P> {
    async fn get_by_id(&self, id: &str) -> Result<Certificate, RepositoryError> {
        let key = id.to_string();
        let row = run_blocking(&self.provider, move |conn| {
                      Ok(certificate::table.find(&key)
                                           .select(CertificateRow::as_select())
                                           .first(conn)
                                           .optional()?)
                  }).await?;
        match row {
            Some(row) => row.into_domain().map_err(RepositoryError::from),
            None => Err(not_found(format!("certificate '{id}'"))),
        }
    }

    async fn get_by_workflow_node_id(&self, node_id: &str) -> Result<Certificate, RepositoryError> {
        let key = node_id.to_string();
        let row = run_blocking(&self.provider, move |conn| {
                      Ok(certificate::table.filter(certificate::workflow_node_id.eq(&key))
                                           .order((certificate::created_at.desc(), certificate::id.desc()))
                                           .select(CertificateRow::as_select())
                                           .first(conn)
                                           .optional()?)
                  }).await?;
        match row {
            Some(row) => row.into_domain().map_err(RepositoryError::from),
            None => Err(not_found(format!("certificate for node '{node_id}'"))),
        }
    }

    async fn save(&self, mut cert: Certificate) -> Result<Certificate, RepositoryError> {
        if cert.id.is_empty() {
            cert.id = new_record_id();
        }
        let row = CertificateRow::from_domain(&cert, Utc::now())?;
        debug!("upsert certificate id={} node={:?}", row.id, row.workflow_node_id);
        let saved = run_blocking(&self.provider, move |conn| {
                        Ok(diesel::insert_into(certificate::table)
                            .values(&row)
                            .on_conflict(certificate::id)
                            .do_update()
                            .set((certificate::source.eq(excluded(certificate::source)),
                                  certificate::subject_alt_names.eq(excluded(certificate::subject_alt_names)),
                                  certificate::serial_number.eq(excluded(certificate::serial_number)),
                                  certificate::issuer_org.eq(excluded(certificate::issuer_org)),
                                  certificate::key_algorithm.eq(excluded(certificate::key_algorithm)),
                                  certificate::certificate_pem.eq(excluded(certificate::certificate_pem)),
                                  certificate::private_key.eq(excluded(certificate::private_key)),
                                  certificate::effect_at.eq(excluded(certificate::effect_at)),
                                  certificate::expire_at.eq(excluded(certificate::expire_at)),
                                  certificate::fingerprint.eq(excluded(certificate::fingerprint)),
                                  certificate::workflow_id.eq(excluded(certificate::workflow_id)),
                                  certificate::workflow_run_id.eq(excluded(certificate::workflow_run_id)),
                                  certificate::workflow_node_id.eq(excluded(certificate::workflow_node_id)),
                                  certificate::workflow_output_id.eq(excluded(certificate::workflow_output_id)),
                                  certificate::updated_at.eq(excluded(certificate::updated_at))))
                            .returning(CertificateRow::as_returning())
                            .get_result(conn)?)
                    }).await?;
        saved.into_domain().map_err(RepositoryError::from)
    }
}

pub struct PgWorkflowRunRepository<P: ConnectionProvider> {
    provider: Arc<P>,
}

impl<P: ConnectionProvider> PgWorkflowRunRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider: Arc::new(provider) }
    }
}

#[async_trait]
impl<P: ConnectionProvider> WorkflowRunRepository for PgWorkflowRunRepository<P> {
    async fn get_by_id(&self, id: &str) -> Result<WorkflowRun, RepositoryError> {
        let key = id.to_string();
        let row = run_blocking(&self.provider, move |conn| {
                      Ok(workflow_run::table.find(&key)
                                            .select(RunRow::as_select())
                                            .first(conn)
                                            .optional()?)
                  }).await?;
        match row {
            Some(row) => row.into_domain().map_err(RepositoryError::from),
            None => Err(not_found(format!("workflow run '{id}'"))),
        }
    }

    async fn save(&self, mut run: WorkflowRun) -> Result<WorkflowRun, RepositoryError> {
        if run.id.is_empty() {
            run.id = new_record_id();
        }
        let row = RunRow::from_domain(&run, Utc::now())?;
        debug!("upsert workflow_run id={} status={}", row.id, row.status);
        let saved = run_blocking(&self.provider, move |conn| {
                        Ok(diesel::insert_into(workflow_run::table)
                            .values(&row)
                            .on_conflict(workflow_run::id)
                            .do_update()
                            .set((workflow_run::status.eq(excluded(workflow_run::status)),
                                  workflow_run::trigger.eq(excluded(workflow_run::trigger)),
                                  workflow_run::started_at.eq(excluded(workflow_run::started_at)),
                                  workflow_run::ended_at.eq(excluded(workflow_run::ended_at)),
                                  workflow_run::logs.eq(excluded(workflow_run::logs)),
                                  workflow_run::error.eq(excluded(workflow_run::error)),
                                  workflow_run::updated_at.eq(excluded(workflow_run::updated_at))))
                            .returning(RunRow::as_returning())
                            .get_result(conn)?)
                    }).await?;
        saved.into_domain().map_err(RepositoryError::from)
    }
}
