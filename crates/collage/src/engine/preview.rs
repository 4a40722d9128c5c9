//! The preview adapter: run an in-flight configuration before it is saved.
//!
//! Previews skip access and active checks (the editor already sits behind
//! workspace auth) and always resolve to a success envelope, so the builder
//! UI can render a failure without handling an error status.

use std::time::Duration;

use serde::Serialize;

use crate::client::SqlExecutor;
use crate::engine::catalog::Catalog;
use crate::engine::CompositionEngine;
use crate::envelope::QueryMetadata;
use crate::error::EngineError;
use crate::query::{CompositionConfig, ParamBag};
use crate::row::JsonRow;

/// Structured pass/fail result of a preview.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<JsonRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<QueryMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PreviewError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewError {
    pub message: String,
    /// The offending field, when the failure names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl PreviewOutcome {
    fn passed(data: Vec<JsonRow>, metadata: QueryMetadata) -> Self {
        Self {
            success: true,
            data: Some(data),
            metadata: Some(metadata),
            error: None,
        }
    }

    fn failed(err: &EngineError) -> Self {
        let field = match err {
            EngineError::InvalidFieldName(name) => Some(name.clone()),
            EngineError::FilterRequiresValue(field) => Some(field.clone()),
            EngineError::JoinCollectionNotFound(slug)
            | EngineError::SourceCollectionNotFound(slug) => Some(slug.clone()),
            _ => None,
        };
        Self {
            success: false,
            data: None,
            metadata: None,
            error: Some(PreviewError {
                message: err.to_string(),
                field,
            }),
        }
    }
}

impl<C: Catalog, X: SqlExecutor> CompositionEngine<C, X> {
    /// Run a draft configuration and report the outcome as data.
    pub async fn preview(
        &self,
        workspace_id: &str,
        config: &CompositionConfig,
        params: ParamBag,
        deadline: Option<Duration>,
    ) -> PreviewOutcome {
        match self.run(workspace_id, None, config, params, deadline).await {
            Ok(output) => PreviewOutcome::passed(output.data, output.metadata),
            Err(err) => PreviewOutcome::failed(&err),
        }
    }
}
