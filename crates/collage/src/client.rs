//! The SQL executor seam between the engine and the database.
//!
//! The engine never touches a connection directly; it hands a [`BuiltQuery`]
//! to whatever implements [`SqlExecutor`]. Implementations exist for a plain
//! client, a caller-owned transaction, and a pooled client, so composition
//! queries can run inside whichever connection scope the caller already
//! holds. Tests substitute an in-memory executor.

use crate::error::{EngineError, EngineResult};
use crate::query::BuiltQuery;
use crate::row::{JsonRow, row_to_map};

/// Executes one built statement and materializes the result rows.
pub trait SqlExecutor: Send + Sync {
    /// Run the statement and return rows as ordered alias → value
    /// dictionaries.
    fn query(
        &self,
        query: &BuiltQuery,
    ) -> impl std::future::Future<Output = EngineResult<Vec<JsonRow>>> + Send;
}

impl SqlExecutor for tokio_postgres::Client {
    async fn query(&self, query: &BuiltQuery) -> EngineResult<Vec<JsonRow>> {
        let params = query.params_ref();
        let rows = tokio_postgres::Client::query(self, query.sql(), &params)
            .await
            .map_err(EngineError::from_db_error)?;
        rows.iter().map(row_to_map).collect()
    }
}

impl SqlExecutor for tokio_postgres::Transaction<'_> {
    async fn query(&self, query: &BuiltQuery) -> EngineResult<Vec<JsonRow>> {
        let params = query.params_ref();
        let rows = tokio_postgres::Transaction::query(self, query.sql(), &params)
            .await
            .map_err(EngineError::from_db_error)?;
        rows.iter().map(row_to_map).collect()
    }
}

#[cfg(feature = "pool")]
impl SqlExecutor for deadpool_postgres::Client {
    async fn query(&self, query: &BuiltQuery) -> EngineResult<Vec<JsonRow>> {
        let client: &tokio_postgres::Client = self;
        SqlExecutor::query(client, query).await
    }
}
