//! Per-request build context.

use std::collections::HashMap;

use serde_json::Value;

/// Request-scoped parameter substitutions (query string or body `params`).
pub type ParamBag = HashMap<String, Value>;

/// Everything the builder needs beyond the configuration itself, resolved
/// by the execution adapter per invocation: tenant scope, collection ids,
/// and the caller's parameter bag.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    pub workspace_id: String,
    /// Resolved id of the source collection (`config.from`)
    pub collection_id: String,
    /// Joined-collection slug → resolved collection id
    pub joined_collections: HashMap<String, String>,
    pub params: ParamBag,
}

impl QueryContext {
    pub fn new(workspace_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            collection_id: collection_id.into(),
            joined_collections: HashMap::new(),
            params: ParamBag::new(),
        }
    }

    pub fn with_joined_collection(
        mut self,
        slug: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        self.joined_collections.insert(slug.into(), id.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}
