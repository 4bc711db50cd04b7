//! Implementaciones Postgres (Diesel) de los repositorios del núcleo.
//!
//! - Paridad con los backends en memoria: upsert por id con
//!   `INSERT ... ON CONFLICT (id) DO UPDATE`, `created_at` preservado y
//!   `updated_at` sellado en cada guardado; "más reciente" = `created_at`
//!   descendente, desempate por id.
//! - Diesel es bloqueante: cada operación corre en
//!   `tokio::task::spawn_blocking` con una conexión del pool r2d2.
//! - Errores transitorios (pool, conflictos de serialización, cortes de
//!   conexión) se reintentan con un backoff corto. Es la única política de
//!   reintento de la capa de almacenamiento; los adaptadores no reintentan.

use std::sync::Arc;

use cert_core::RepositoryError;
use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use log::{info, warn};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

mod repos;
mod rows;

pub use repos::{PgCertificateRepository, PgWorkflowOutputRepository, PgWorkflowRunRepository};

/// Pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones. Permite inyectar el pool real o uno
/// de prueba sin acoplar los repositorios a r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// `ConnectionProvider` respaldado por un `PgPool`.
#[derive(Clone)]
pub struct PoolProvider {
    pub pool: PgPool,
}

impl PoolProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// `true` si conviene reintentar.
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
            || m.contains("could not serialize access due to concurrent update")
            || m.contains("terminating connection due to administrator command")
            || m.contains("connection closed")
            || m.contains("connection refused")
        }
        _ => false,
    }
}

/// Hasta 3 reintentos con backoff de 15ms, 30ms, 45ms.
pub(crate) fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms", attempts + 1, e, delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Corre `f` fuera del runtime async con reintentos y traduce el error a la
/// frontera del núcleo.
pub(crate) async fn run_blocking<P, T, F>(provider: &Arc<P>, f: F) -> Result<T, RepositoryError>
    where P: ConnectionProvider,
          T: Send + 'static,
          F: Fn(&mut PgConnection) -> Result<T, PersistenceError> + Send + 'static
{
    let provider = Arc::clone(provider);
    tokio::task::spawn_blocking(move || {
        with_retry(|| {
            let mut conn = provider.connection()?;
            f(&mut conn)
        })
    })
    .await
    .map_err(|e| RepositoryError::Storage(format!("blocking task failed: {e}")))?
    .map_err(RepositoryError::from)
}

/// Construye un pool Postgres r2d2 y corre las migraciones pendientes.
///
/// Si `min_size > max_size` se usa `min = max`; tamaños 0 se elevan a 1.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    info!("postgres pool ready (min={final_min}, max={validated_max})");
    Ok(pool)
}

/// Carga `.env`, lee `DbConfig` y construye un pool ya migrado.
pub fn build_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
