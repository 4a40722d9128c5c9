//! Collection schema: field definitions and their constraint options.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of field types a collection can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Boolean,
    Date,
    Datetime,
    Select,
    MultiSelect,
    Relation,
    Json,
}

/// One declared field of a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Key under which the value lives in the record document
    pub slug: String,
    /// Display name
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    /// Applied to absent keys on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "FieldOptions::is_empty")]
    pub options: FieldOptions,
}

impl FieldDef {
    pub fn new(slug: impl Into<String>, field_type: FieldType) -> Self {
        let slug = slug.into();
        Self {
            name: slug.clone(),
            slug,
            field_type,
            required: false,
            unique: false,
            default: None,
            options: FieldOptions::default(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_options(mut self, options: FieldOptions) -> Self {
        self.options = options;
        self
    }
}

/// Type-specific constraints.
///
/// Which keys are meaningful depends on the field type; unused keys are
/// simply ignored by the validator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOptions {
    /// Enum choices for select / multi_select
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    /// Inclusive numeric bounds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Text length bounds (in characters)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Maximum number of decimal places
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// Regex the text value must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl FieldOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn choices(values: &[&str]) -> Self {
        Self {
            choices: Some(values.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        }
    }
}
