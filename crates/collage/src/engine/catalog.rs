//! The catalog seam: slug → id resolution for workspaces, compositions,
//! and collections.
//!
//! The engine only needs lookups; the CRUD repositories behind them live
//! outside the crate. An application backs this trait with its own store;
//! tests use an in-memory one.

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::query::CompositionConfig;

/// A tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub slug: String,
}

/// Who may execute a composition through the public endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// Never served publicly
    Private,
    /// Requires an authenticated caller
    Internal,
    /// Open
    Public,
}

/// A stored composition: slug-addressed query spec plus access policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub id: String,
    pub slug: String,
    pub access: AccessLevel,
    pub is_active: bool,
    pub config: CompositionConfig,
}

/// An authenticated caller.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
}

/// Lookup contract the execution adapter depends on.
///
/// Every method returns `Ok(None)` for "no such slug"; the adapter turns
/// that into the appropriate not-found error for its step.
pub trait Catalog: Send + Sync {
    fn workspace_by_slug(
        &self,
        slug: &str,
    ) -> impl std::future::Future<Output = EngineResult<Option<Workspace>>> + Send;

    fn composition_by_slug(
        &self,
        workspace_id: &str,
        slug: &str,
    ) -> impl std::future::Future<Output = EngineResult<Option<Composition>>> + Send;

    fn collection_id_by_slug(
        &self,
        workspace_id: &str,
        slug: &str,
    ) -> impl std::future::Future<Output = EngineResult<Option<String>>> + Send;
}
