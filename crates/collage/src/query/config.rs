//! The stored shape of a composition: a declarative query specification.
//!
//! This is exactly the JSON persisted in the compositions table. Operator,
//! function, join-type, and direction names stay plain strings here; the
//! builder matches them against its closed sets and raises typed errors, so
//! an unknown name in a stored payload surfaces as a 400 rather than a
//! deserialization failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A composition configuration. Everything but `from` is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionConfig {
    /// Source collection slug
    pub from: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<JoinSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<AggregationSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl CompositionConfig {
    /// Minimal configuration over a source collection.
    pub fn from_collection(slug: impl Into<String>) -> Self {
        Self {
            from: slug.into(),
            joins: Vec::new(),
            select: Vec::new(),
            group_by: Vec::new(),
            aggregations: Vec::new(),
            filters: Vec::new(),
            sort: Vec::new(),
            limit: None,
        }
    }
}

/// One join onto another collection of the same workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinSpec {
    /// Joined collection slug
    pub collection: String,
    pub on: JoinOn,
    /// One of `inner`, `left`, `right`
    #[serde(rename = "type")]
    pub join_type: String,
}

/// Join condition over JSON-extracted keys: `source.left = joined.right`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinOn {
    pub left: String,
    pub right: String,
}

/// One aggregated projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationSpec {
    /// Field slug, or `*` for `count`
    pub field: String,
    /// One of `count`, `sum`, `avg`, `min`, `max`
    pub function: String,
    /// Caller-chosen output alias; must be a valid identifier
    pub alias: String,
}

/// One WHERE condition.
///
/// `param` takes precedence over `value`: when set, the value is read from
/// the request's parameter bag, and a missing bag key drops the whole filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSpec {
    pub field: String,
    /// One of `eq`, `neq`, `gt`, `gte`, `lt`, `lte`, `contains`, `in`
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl FilterSpec {
    pub fn literal(field: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: Some(value),
            param: None,
        }
    }

    pub fn parameterized(
        field: impl Into<String>,
        operator: impl Into<String>,
        param: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: None,
            param: Some(param.into()),
        }
    }
}

/// One ORDER BY entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    /// One of `asc`, `desc`
    pub direction: String,
}
