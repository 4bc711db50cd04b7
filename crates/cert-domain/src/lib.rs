//! cert-domain: modelo de datos del ciclo de vida de certificados.
//!
//! Contiene las entidades que viajan entre el núcleo de ejecución y la capa
//! de persistencia (nodos, runs, outputs, logs y certificados) junto con el
//! validador de material PEM. No realiza I/O.
pub mod certificate;
pub mod error;
pub mod output;
pub mod run;
pub mod workflow;

#[cfg(feature = "test-support")]
pub mod fixtures;

pub use certificate::{parse_certificate_pem, validate_private_key_pem, Certificate, CertificateSource, ParsedCertificate};
pub use error::DomainError;
pub use output::{WorkflowOutput, CERTIFICATE_SLOT};
pub use run::{LogLevel, LogRecord, RunStatus, RunTrigger, WorkflowRun, WorkflowRunLog};
pub use workflow::{ApplyNodeConfig, DeployNodeConfig, NodeConfig, NodeType, NotifyNodeConfig, UploadNodeConfig, Workflow,
                   WorkflowNode, WorkflowNodeIo};
