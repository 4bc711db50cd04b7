//! cert-core: núcleo de ejecución de workflows de certificados.
//!
//! - `processor`: procesadores de nodo (apply, upload, deploy, notify, ...)
//!   y el registro tipo de nodo -> constructor.
//! - `provider`: contrato de adaptadores (deployer, uploader, notifier,
//!   emisor ACME) y normalización de dominios.
//! - `repo`: repositorios, backends en memoria y el contrato compuesto de
//!   persistencia de outputs.
//! - `logging`: `LogSink` inyectado en procesadores y adaptadores.
//! - `context`: cancelación y plazos.
//! - `engine`: orquestador secuencial mínimo.
pub mod constants;
pub mod context;
pub mod engine;
pub mod errors;
pub mod hashing;
pub mod logging;
pub mod processor;
pub mod provider;
pub mod repo;

pub use context::NodeContext;
pub use engine::{RunnerBuilder, WorkflowRunner};
pub use errors::{AdapterError, ErrorKind, RepositoryError, WorkflowError};
pub use logging::{LogSink, NilLogSink, NodeLogger, RunLogBook};
pub use processor::{NodeProcessor, ProcessorDeps, ProcessorRegistry};
pub use provider::{CertificateIssuer, DeployResult, Deployer, DeployerFactory, IssueRequest, IssuedCertificate, Notifier,
                   NotifierFactory, UploadResult, Uploader, UploaderFactory};
pub use repo::{CertificateRepository, InMemoryCertificateRepository, InMemoryWorkflowOutputRepository,
               InMemoryWorkflowRunRepository, OutputPersistence, WorkflowOutputRepository, WorkflowRunRepository};
