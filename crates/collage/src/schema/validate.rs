//! Record validation against a collection's declared fields.
//!
//! `validate_record` takes a candidate JSON document and either returns a
//! normalized document (coerced values, defaults applied) or every error it
//! found. Uniqueness is declared on fields but needs a database lookup, so
//! it is enforced outside the validator.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Number, Value};

use crate::schema::errors::{ValidationCode, ValidationError, ValidationErrors};
use crate::schema::field::{FieldDef, FieldType};

/// Whether the document is a full create payload or a partial update.
///
/// Update mode validates only the provided keys: required fields may be
/// absent, defaults are not applied, and unknown keys pass through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Update,
}

/// Validate and normalize a candidate record document.
pub fn validate_record(
    fields: &[FieldDef],
    doc: &Map<String, Value>,
    mode: ValidationMode,
) -> Result<Map<String, Value>, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut normalized = Map::new();

    let known: Vec<&str> = fields.iter().map(|f| f.slug.as_str()).collect();
    for (key, value) in doc {
        if known.contains(&key.as_str()) {
            continue;
        }
        match mode {
            ValidationMode::Create => errors.push(ValidationError::new(
                key.clone(),
                ValidationCode::UnknownField,
                "is not a declared field",
            )),
            // Storage is type-opaque; stray keys on update are external
            // policy, not the validator's.
            ValidationMode::Update => {
                normalized.insert(key.clone(), value.clone());
            }
        }
    }

    for field in fields {
        match doc.get(&field.slug) {
            None => {
                if mode == ValidationMode::Update {
                    continue;
                }
                if let Some(default) = &field.default {
                    normalized.insert(field.slug.clone(), default.clone());
                } else if field.required {
                    errors.push(ValidationError::new(
                        field.slug.clone(),
                        ValidationCode::Required,
                        "is required",
                    ));
                }
            }
            Some(Value::Null) => {
                if field.required {
                    errors.push(ValidationError::new(
                        field.slug.clone(),
                        ValidationCode::Required,
                        "is required",
                    ));
                } else {
                    normalized.insert(field.slug.clone(), Value::Null);
                }
            }
            Some(value) => match coerce_value(field, value) {
                Ok(coerced) => {
                    normalized.insert(field.slug.clone(), coerced);
                }
                Err(field_errors) => errors.extend(field_errors),
            },
        }
    }

    if errors.is_empty() {
        Ok(normalized)
    } else {
        Err(errors)
    }
}

fn coerce_value(field: &FieldDef, value: &Value) -> Result<Value, Vec<ValidationError>> {
    match field.field_type {
        FieldType::Text | FieldType::Textarea => coerce_text(field, value),
        FieldType::Number => coerce_number(field, value),
        FieldType::Boolean => coerce_boolean(field, value),
        FieldType::Date => coerce_date(field, value),
        FieldType::Datetime => coerce_datetime(field, value),
        FieldType::Select => coerce_select(field, value),
        FieldType::MultiSelect => coerce_multi_select(field, value),
        FieldType::Relation => coerce_relation(field, value),
        FieldType::Json => Ok(value.clone()),
    }
}

fn coerce_text(field: &FieldDef, value: &Value) -> Result<Value, Vec<ValidationError>> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return Err(vec![type_error(field, "must be a string")]),
    };

    let mut errors = Vec::new();
    let len = text.chars().count();
    if let Some(min) = field.options.min_length {
        if len < min {
            errors.push(ValidationError::new(
                field.slug.clone(),
                ValidationCode::Len,
                format!("must be at least {min} characters"),
            ));
        }
    }
    if let Some(max) = field.options.max_length {
        if len > max {
            errors.push(ValidationError::new(
                field.slug.clone(),
                ValidationCode::Len,
                format!("must be at most {max} characters"),
            ));
        }
    }
    if let Some(pattern) = &field.options.pattern {
        match compiled(pattern) {
            Some(re) if !re.is_match(&text) => errors.push(ValidationError::new(
                field.slug.clone(),
                ValidationCode::Regex,
                format!("must match pattern {pattern}"),
            )),
            Some(_) => {}
            None => errors.push(ValidationError::new(
                field.slug.clone(),
                ValidationCode::Custom("pattern".into()),
                "has an invalid pattern configured",
            )),
        }
    }

    if errors.is_empty() {
        Ok(Value::String(text))
    } else {
        Err(errors)
    }
}

fn coerce_number(field: &FieldDef, value: &Value) -> Result<Value, Vec<ValidationError>> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    let Some(number) = number.filter(|n| n.is_finite()) else {
        return Err(vec![type_error(field, "must be a finite number")]);
    };

    let mut errors = Vec::new();
    if let Some(min) = field.options.min {
        if number < min {
            errors.push(ValidationError::new(
                field.slug.clone(),
                ValidationCode::Range,
                format!("must be at least {min}"),
            ));
        }
    }
    if let Some(max) = field.options.max {
        if number > max {
            errors.push(ValidationError::new(
                field.slug.clone(),
                ValidationCode::Range,
                format!("must be at most {max}"),
            ));
        }
    }
    if let Some(precision) = field.options.precision {
        if decimal_places(number) > precision {
            errors.push(ValidationError::new(
                field.slug.clone(),
                ValidationCode::Precision,
                format!("must have at most {precision} decimal places"),
            ));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    // Keep integral inputs integral in the normalized document.
    let normalized = match value {
        Value::Number(n) => Value::Number(n.clone()),
        _ => Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
    };
    Ok(normalized)
}

fn coerce_boolean(field: &FieldDef, value: &Value) -> Result<Value, Vec<ValidationError>> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::String(s) if s == "true" => Ok(Value::Bool(true)),
        Value::String(s) if s == "false" => Ok(Value::Bool(false)),
        _ => Err(vec![type_error(field, "must be a boolean")]),
    }
}

fn coerce_date(field: &FieldDef, value: &Value) -> Result<Value, Vec<ValidationError>> {
    let Value::String(s) = value else {
        return Err(vec![type_error(field, "must be an ISO-8601 date string")]);
    };
    let ok = NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(s).is_ok();
    if ok {
        Ok(value.clone())
    } else {
        Err(vec![type_error(field, "must be an ISO-8601 date string")])
    }
}

fn coerce_datetime(field: &FieldDef, value: &Value) -> Result<Value, Vec<ValidationError>> {
    let Value::String(s) = value else {
        return Err(vec![type_error(field, "must be an ISO-8601 datetime string")]);
    };
    let ok = DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok();
    if ok {
        Ok(value.clone())
    } else {
        Err(vec![type_error(field, "must be an ISO-8601 datetime string")])
    }
}

fn coerce_select(field: &FieldDef, value: &Value) -> Result<Value, Vec<ValidationError>> {
    let Value::String(s) = value else {
        return Err(vec![type_error(field, "must be a string")]);
    };
    let Some(choices) = &field.options.choices else {
        return Err(vec![ValidationError::new(
            field.slug.clone(),
            ValidationCode::Custom("choices".into()),
            "has no configured choices",
        )]);
    };
    if choices.contains(s) {
        Ok(value.clone())
    } else {
        Err(vec![ValidationError::new(
            field.slug.clone(),
            ValidationCode::OneOf,
            format!("must be one of: {}", choices.join(", ")),
        )])
    }
}

fn coerce_multi_select(field: &FieldDef, value: &Value) -> Result<Value, Vec<ValidationError>> {
    let Value::Array(items) = value else {
        return Err(vec![type_error(field, "must be an array of strings")]);
    };
    let Some(choices) = &field.options.choices else {
        return Err(vec![ValidationError::new(
            field.slug.clone(),
            ValidationCode::Custom("choices".into()),
            "has no configured choices",
        )]);
    };

    let mut invalid = Vec::new();
    for item in items {
        match item {
            Value::String(s) if choices.contains(s) => {}
            Value::String(s) => invalid.push(s.clone()),
            _ => return Err(vec![type_error(field, "must be an array of strings")]),
        }
    }
    if invalid.is_empty() {
        Ok(value.clone())
    } else {
        Err(vec![ValidationError::new(
            field.slug.clone(),
            ValidationCode::OneOf,
            format!("contains invalid choices: {}", invalid.join(", ")),
        )])
    }
}

fn coerce_relation(field: &FieldDef, value: &Value) -> Result<Value, Vec<ValidationError>> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(value.clone()),
        _ => Err(vec![type_error(field, "must be a record id")]),
    }
}

fn type_error(field: &FieldDef, message: &str) -> ValidationError {
    ValidationError::new(field.slug.clone(), ValidationCode::Type, message)
}

fn decimal_places(n: f64) -> u32 {
    let text = n.to_string();
    match text.split_once('.') {
        Some((_, frac)) => frac.trim_end_matches('0').len() as u32,
        None => 0,
    }
}

/// Compile a user-configured pattern, caching across calls.
fn compiled(pattern: &str) -> Option<regex::Regex> {
    static CACHE: OnceLock<Mutex<HashMap<String, regex::Regex>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    let mut cache = cache.lock().expect("regex cache poisoned");
    if let Some(re) = cache.get(pattern) {
        return Some(re.clone());
    }
    let re = regex::Regex::new(pattern).ok()?;
    cache.insert(pattern.to_string(), re.clone());
    Some(re)
}
