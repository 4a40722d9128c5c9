//! # collage
//!
//! A composition query engine for schema-less record collections on
//! PostgreSQL.
//!
//! Workspaces hold collections of JSON records in a single physical table.
//! A *composition* is a stored, declarative query specification over those
//! collections; this crate compiles it into one safe, parameterized SQL
//! statement and executes it in the workspace's authorization context.
//!
//! ## Design
//!
//! - **Allow-list safety**: every identifier passes the sanitizer before it
//!   can appear in SQL position; every literal is bound as `$n`
//! - **Small algebra**: field expressions are a closed sum (simple /
//!   date-function / joined-collection) with total parsing and emission
//! - **Two collaborator seams**: a [`Catalog`] resolves slugs to ids and a
//!   [`SqlExecutor`] runs the finished statement, so the engine itself is
//!   pure per request and holds no shared state

pub mod client;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod expr;
pub mod ident;
pub mod query;
pub mod row;
pub mod schema;

pub use client::SqlExecutor;
pub use config::EngineConfig;
pub use engine::{
    AccessLevel, Catalog, Composition, CompositionEngine, ExecuteOptions, PreviewOutcome,
    Principal, Workspace,
};
pub use envelope::{ErrorBody, QueryMetadata, QueryOutput};
pub use error::{EngineError, EngineResult};
pub use expr::{DateFunc, FieldExpr, output_alias};
pub use ident::sanitize;
pub use query::{
    AggregationSpec, BindValue, BuiltQuery, CompositionConfig, FilterSpec, JoinOn, JoinSpec,
    ParamBag, QueryContext, SortSpec, build_query,
};
pub use row::{JsonRow, row_to_map};
pub use schema::{
    FieldDef, FieldOptions, FieldType, ValidationErrors, ValidationMode, validate_record,
};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};
