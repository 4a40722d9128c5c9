//! Field expressions: the user-facing algebra over record fields.
//!
//! A field expression is one of three closed forms:
//!
//! - `name` — a field of the source collection
//! - `fn(name)` — one of the fixed date functions applied to a field
//! - `coll.name` — a field of a joined collection
//!
//! Resolution order is function first, qualified second, simple last. Every
//! identifier inside an expression passes through [`sanitize`] before it can
//! reach SQL position.

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};
use crate::ident::sanitize;

/// The fixed family of date functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFunc {
    Month,
    Year,
    Day,
    Date,
}

impl DateFunc {
    /// Match a function name case-insensitively against the closed set.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            "day" => Some(Self::Day),
            "date" => Some(Self::Date),
            _ => None,
        }
    }
}

/// A parsed field expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldExpr {
    /// `category`
    Simple { field: String },
    /// `month(date)`
    Function { func: DateFunc, field: String },
    /// `accounts.type`
    Qualified { collection: String, field: String },
}

impl FieldExpr {
    /// Parse a user-authored expression string.
    pub fn parse(input: &str) -> EngineResult<Self> {
        if let Some((func, inner)) = split_function(input) {
            let func = DateFunc::from_name(func)
                .ok_or_else(|| EngineError::UnknownFunction(func.to_string()))?;
            let field = sanitize(inner)?.to_string();
            return Ok(Self::Function { func, field });
        }

        if let Some((collection, field)) = input.split_once('.') {
            return Ok(Self::Qualified {
                collection: sanitize(collection)?.to_string(),
                field: sanitize(field)?.to_string(),
            });
        }

        Ok(Self::Simple {
            field: sanitize(input)?.to_string(),
        })
    }

    /// Render the expression as a SQL fragment over the given source alias.
    ///
    /// JSON extraction via `->>` always yields text; date forms carry their
    /// own `::date` cast so callers never have to. `joins` maps a joined
    /// collection slug to its table alias.
    pub fn to_sql(
        &self,
        table_alias: &str,
        joins: &HashMap<String, String>,
    ) -> EngineResult<String> {
        match self {
            Self::Simple { field } => Ok(format!("{table_alias}.data->>'{field}'")),
            Self::Function { func, field } => Ok(match func {
                DateFunc::Month => format!("to_char((data->>'{field}')::date, 'YYYY-MM')"),
                DateFunc::Year => format!("to_char((data->>'{field}')::date, 'YYYY')"),
                DateFunc::Day => format!("to_char((data->>'{field}')::date, 'YYYY-MM-DD')"),
                DateFunc::Date => format!("(data->>'{field}')::date"),
            }),
            Self::Qualified { collection, field } => {
                let alias = joins
                    .get(collection)
                    .ok_or_else(|| EngineError::JoinCollectionNotFound(collection.clone()))?;
                Ok(format!("{alias}.data->>'{field}'"))
            }
        }
    }
}

/// Derive the output alias for a projected expression.
///
/// Lower-case the raw input, fold `(`, `)` and `.` to `_`, then strip
/// trailing underscores. The result is the key under which the column
/// appears in result rows, and the only name `ORDER BY` can use to refer
/// back to a projection. The rule is total and idempotent; two inputs that
/// differ only in case or punctuation collide by design.
pub fn output_alias(input: &str) -> String {
    let mut alias: String = input
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '(' | ')' | '.' => '_',
            c => c,
        })
        .collect();
    while alias.ends_with('_') {
        alias.pop();
    }
    alias
}

fn split_function(input: &str) -> Option<(&str, &str)> {
    input.strip_suffix(')')?.split_once('(')
}
