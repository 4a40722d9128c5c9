//! The query builder: composition configuration → one parameterized SQL
//! statement over the records table.

pub mod builder;
pub mod config;
pub mod context;
pub mod param;

pub use builder::build_query;
pub use config::{AggregationSpec, CompositionConfig, FilterSpec, JoinOn, JoinSpec, SortSpec};
pub use context::{ParamBag, QueryContext};
pub use param::{BindValue, BuiltQuery};
