//! Row materialization: `tokio_postgres::Row` → ordered JSON dictionary.
//!
//! Result rows are keyed by column alias in projection order (the map
//! preserves insertion order). Engine-built queries only ever produce a
//! small set of column types: text from `->>` extraction, numerics from
//! casts and aggregates, and the raw source columns of the default
//! projection.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Number, Value};
use tokio_postgres::Row;
use tokio_postgres::types::Type;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// One result row as an ordered alias → value dictionary.
pub type JsonRow = Map<String, Value>;

/// Convert a row into a JSON dictionary keyed by column alias.
pub fn row_to_map(row: &Row) -> EngineResult<JsonRow> {
    let mut map = Map::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_value(row, idx, column.type_(), column.name())?;
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

fn column_value(row: &Row, idx: usize, ty: &Type, name: &str) -> EngineResult<Value> {
    let decode = |e: tokio_postgres::Error| EngineError::internal(format!(
        "failed to decode column '{name}': {e}"
    ));

    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)
            .map_err(decode)?
            .map(Value::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)
            .map_err(decode)?
            .map(|v| Value::Number(v.into()))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)
            .map_err(decode)?
            .map(|v| Value::Number(v.into()))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)
            .map_err(decode)?
            .map(|v| Value::Number(v.into()))
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)
            .map_err(decode)?
            .map(|v| float_to_json(v as f64))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)
            .map_err(decode)?
            .map(float_to_json)
    } else if *ty == Type::NUMERIC {
        row.try_get::<_, Option<Decimal>>(idx)
            .map_err(decode)?
            .map(numeric_to_json)
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
    {
        row.try_get::<_, Option<String>>(idx)
            .map_err(decode)?
            .map(Value::String)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<Value>>(idx).map_err(decode)?
    } else if *ty == Type::UUID {
        row.try_get::<_, Option<Uuid>>(idx)
            .map_err(decode)?
            .map(|v| Value::String(v.to_string()))
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<NaiveDate>>(idx)
            .map_err(decode)?
            .map(|v| Value::String(v.format("%Y-%m-%d").to_string()))
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(idx)
            .map_err(decode)?
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<DateTime<Utc>>>(idx)
            .map_err(decode)?
            .map(|v| Value::String(v.to_rfc3339()))
    } else {
        return Err(EngineError::internal(format!(
            "unsupported column type '{}' for column '{name}'",
            ty.name()
        )));
    };
    Ok(value.unwrap_or(Value::Null))
}

fn float_to_json(v: f64) -> Value {
    Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// NUMERIC values become JSON numbers when exactly representable, otherwise
/// their decimal string, so aggregates over big values never silently lose
/// digits.
fn numeric_to_json(v: Decimal) -> Value {
    let text = v.to_string();
    if let Some(f) = v.to_f64() {
        if f.is_finite() && Decimal::try_from(f).map(|d| d == v).unwrap_or(false) {
            if let Some(n) = Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    }
    Value::String(text)
}
