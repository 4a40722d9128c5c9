//! Bound parameter values and the built-query output type.

use bytes::BytesMut;
use rust_decimal::Decimal;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// A value bound to a `$n` placeholder.
///
/// The builder only ever binds these three shapes: text for equality and
/// pattern filters (JSON extraction compares as text), decimals for the
/// `::numeric` comparison family, and integers for LIMIT. The closed set
/// keeps built queries comparable in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Number(Decimal),
    Int(i64),
}

impl From<&str> for BindValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for BindValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for BindValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<Decimal> for BindValue {
    fn from(v: Decimal) -> Self {
        Self::Number(v)
    }
}

impl ToSql for BindValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            Self::Text(v) => v.to_sql(ty, out),
            Self::Number(v) => v.to_sql(ty, out),
            Self::Int(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // The variant decides at encode time; placeholders are typed by the
        // SQL the builder emitted around them.
        true
    }

    to_sql_checked!();
}

/// The output of a build: one SQL statement and its value vector.
///
/// Placeholders are `$1..$n` in the order values were appended; the number
/// of placeholders always equals `values().len()`.
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub(crate) sql: String,
    pub(crate) values: Vec<BindValue>,
}

impl BuiltQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[BindValue] {
        &self.values
    }

    /// Borrow the values as tokio-postgres parameter references.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect()
    }
}
