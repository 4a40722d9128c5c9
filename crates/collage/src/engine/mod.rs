//! The execution adapter: slug-addressed composition execution.
//!
//! `execute` resolves `(workspaceSlug, compositionSlug)` through the
//! [`Catalog`], enforces the composition's access policy, builds the query,
//! runs it through the [`SqlExecutor`], and shapes the result envelope.
//! Build-time and driver errors are translated at this single seam; SQL
//! never crosses it.

pub mod catalog;
pub mod preview;

pub use catalog::{AccessLevel, Catalog, Composition, Principal, Workspace};
pub use preview::{PreviewError, PreviewOutcome};

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;

use crate::client::SqlExecutor;
use crate::envelope::{QueryMetadata, QueryOutput};
use crate::error::{EngineError, EngineResult};
use crate::query::{CompositionConfig, ParamBag, QueryContext, build_query};

/// Row ceiling applied when a composition does not set its own limit.
pub const DEFAULT_ROW_CEILING: i64 = 1000;

/// Per-call execution options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions<'a> {
    /// Authenticated caller, if any
    pub principal: Option<&'a Principal>,
    /// Deadline for the statement; expiry cancels the request with
    /// `DeadlineExceeded` and never returns partial results
    pub deadline: Option<Duration>,
}

/// The composition query engine, generic over its two collaborators.
pub struct CompositionEngine<C, X> {
    catalog: C,
    executor: X,
    max_rows: i64,
}

impl<C: Catalog, X: SqlExecutor> CompositionEngine<C, X> {
    pub fn new(catalog: C, executor: X) -> Self {
        Self {
            catalog,
            executor,
            max_rows: DEFAULT_ROW_CEILING,
        }
    }

    /// Override the row ceiling applied to limitless compositions.
    pub fn with_max_rows(mut self, max_rows: i64) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Execute a stored composition in the authorization context of its
    /// workspace.
    pub async fn execute(
        &self,
        workspace_slug: &str,
        composition_slug: &str,
        params: ParamBag,
        opts: ExecuteOptions<'_>,
    ) -> EngineResult<QueryOutput> {
        let workspace = self
            .catalog
            .workspace_by_slug(workspace_slug)
            .await?
            .ok_or(EngineError::WorkspaceNotFound)?;

        let composition = self
            .catalog
            .composition_by_slug(&workspace.id, composition_slug)
            .await?
            .ok_or(EngineError::CompositionNotFound)?;

        check_access(&composition, opts.principal)?;

        self.run(
            &workspace.id,
            Some(&composition.id),
            &composition.config,
            params,
            opts.deadline,
        )
        .await
        .map_err(|err| match err {
            // Identifier problems in a stored configuration surface as
            // validation failures on the execute path.
            EngineError::InvalidFieldName(name) => {
                EngineError::validation(format!("invalid field name: {name}"))
            }
            other => other,
        })
    }

    /// Resolve collections, build, and execute one configuration.
    pub(crate) async fn run(
        &self,
        workspace_id: &str,
        composition_id: Option<&str>,
        config: &CompositionConfig,
        params: ParamBag,
        deadline: Option<Duration>,
    ) -> EngineResult<QueryOutput> {
        let collection_id = self
            .catalog
            .collection_id_by_slug(workspace_id, &config.from)
            .await?
            .ok_or_else(|| EngineError::SourceCollectionNotFound(config.from.clone()))?;

        let mut joined_collections = HashMap::new();
        for join in &config.joins {
            let id = self
                .catalog
                .collection_id_by_slug(workspace_id, &join.collection)
                .await?
                .ok_or_else(|| EngineError::JoinCollectionNotFound(join.collection.clone()))?;
            joined_collections.insert(join.collection.clone(), id);
        }

        let config = {
            let mut config = config.clone();
            if config.limit.is_none() {
                config.limit = Some(self.max_rows);
            }
            config
        };

        let ctx = QueryContext {
            workspace_id: workspace_id.to_string(),
            collection_id,
            joined_collections,
            params,
        };
        let built = build_query(&config, &ctx)?;

        let rows = match deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.executor.query(&built))
                .await
                .map_err(|_| EngineError::DeadlineExceeded)??,
            None => self.executor.query(&built).await?,
        };

        Ok(QueryOutput {
            metadata: QueryMetadata {
                count: rows.len(),
                composition_id: composition_id.map(str::to_string),
                executed_at: Utc::now(),
            },
            data: rows,
        })
    }
}

fn check_access(composition: &Composition, principal: Option<&Principal>) -> EngineResult<()> {
    if !composition.is_active {
        return Err(EngineError::Forbidden);
    }
    match composition.access {
        AccessLevel::Private => Err(EngineError::Forbidden),
        AccessLevel::Internal if principal.is_none() => Err(EngineError::Unauthorized),
        AccessLevel::Internal | AccessLevel::Public => Ok(()),
    }
}

#[cfg(test)]
mod tests;
