//! cert-persistence
//!
//! Backends Postgres (Diesel + r2d2) de los repositorios de `cert-core`:
//! outputs de nodo, certificados y runs. El contrato compuesto de outputs
//! (`OutputPersistence`) vive en el núcleo y se apoya en estos repositorios
//! igual que en los backends en memoria.
//!
//! Módulos:
//! - `pg`: pool, proveedor de conexiones, reintentos y repositorios.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde `.env` / entorno.
//! - `schema`: tablas Diesel.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_pool, build_pool_from_env, ConnectionProvider, PgCertificateRepository, PgPool,
             PgWorkflowOutputRepository, PgWorkflowRunRepository, PoolProvider};
