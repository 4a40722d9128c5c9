//! Connection pool utilities.
//!
//! One pool is shared across requests; the engine checks a client out per
//! request and never retains it. Readers run on ordinary connections;
//! record writes may run inside a caller-owned transaction.

use deadpool_postgres::{Manager, ManagerConfig, Pool, PoolBuilder, RecyclingMethod};
use tokio_postgres::NoTls;
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};

use crate::error::{EngineError, EngineResult};

/// Create a connection pool from a database URL with default sizing.
///
/// Uses `NoTls`, suitable for local development. For TLS or pool tuning use
/// [`create_pool_with_manager_config`].
pub fn create_pool(database_url: &str) -> EngineResult<Pool> {
    create_pool_with_config(database_url, 16)
}

/// Create a connection pool with an explicit maximum size.
pub fn create_pool_with_config(database_url: &str, max_size: usize) -> EngineResult<Pool> {
    create_pool_with_manager_config(database_url, NoTls, default_manager_config(), |builder| {
        builder.max_size(max_size)
    })
}

/// Create a connection pool with injected TLS, manager, and pool settings.
pub fn create_pool_with_manager_config<T>(
    database_url: &str,
    tls: T,
    manager_config: ManagerConfig,
    configure_pool: impl FnOnce(PoolBuilder) -> PoolBuilder,
) -> EngineResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| EngineError::Connection(e.to_string()))?;

    let mgr = Manager::from_config(pg_config, tls, manager_config);
    configure_pool(Pool::builder(mgr))
        .build()
        .map_err(|e| EngineError::Pool(e.to_string()))
}

fn default_manager_config() -> ManagerConfig {
    ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    }
}
