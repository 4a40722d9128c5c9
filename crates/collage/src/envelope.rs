//! Response envelopes and the transport-level error shape.
//!
//! The crate ships no HTTP server; these are the serialized shapes an HTTP
//! layer returns, plus the status mapping on [`EngineError`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;
use crate::row::JsonRow;

/// Successful execution result: rows plus metadata.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub data: Vec<JsonRow>,
    pub metadata: QueryMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetadata {
    pub count: usize,
    /// Absent for previews of unsaved configurations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition_id: Option<String>,
    pub executed_at: DateTime<Utc>,
}

/// Error envelope: `{ code, message, details? }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    pub fn new(err: &EngineError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&EngineError> for ErrorBody {
    fn from(err: &EngineError) -> Self {
        Self::new(err)
    }
}
