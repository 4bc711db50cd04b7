//! certflow: orquestación de workflows de certificados TLS.
//!
//! Este crate es la fachada de la aplicación:
//! - Reexporta los crates del workspace (`domain`, `engine`, `adapters`,
//!   `persistence`).
//! - `config`: configuración por entorno.
//! - `runtime`: ensambla runner, repositorios y proveedores.
//! - `loader` e `inspect`: soporte de la CLI.

pub use cert_adapters as adapters;
pub use cert_core as engine;
pub use cert_domain as domain;
pub use cert_persistence as persistence;

pub mod config;
pub mod inspect;
pub mod loader;
pub mod runtime;

pub use config::{AppConfig, ConfigError};
pub use inspect::CertificateReport;
pub use loader::{load_workflow, LoadError};
pub use runtime::{Backend, Runtime};
