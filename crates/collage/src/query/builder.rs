//! Composition → parameterized SQL.
//!
//! One build call walks a [`CompositionConfig`] and emits a single statement
//! over the records table. Clauses are emitted in a fixed order — SELECT,
//! FROM, JOINs, WHERE, GROUP BY, ORDER BY, LIMIT — and values are appended
//! to the vector in that same order, so `$n` numbering is a stable contract:
//! join-scope parameters precede WHERE-scope parameters, and LIMIT binds
//! last.
//!
//! No user-supplied string reaches SQL position without passing
//! [`sanitize`]; every literal travels through the value vector. Identifiers
//! and aliases are never quoted, which keeps output aliases byte-identical
//! to the derivation rule in [`output_alias`].

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::expr::{FieldExpr, output_alias};
use crate::ident::sanitize;
use crate::query::config::{AggregationSpec, CompositionConfig, FilterSpec};
use crate::query::context::QueryContext;
use crate::query::param::{BindValue, BuiltQuery};

/// Physical table holding all records across collections.
const RECORDS_TABLE: &str = "records";
/// Alias of the source-collection rows.
const SOURCE_ALIAS: &str = "r";

/// Build one parameterized statement for a composition.
pub fn build_query(config: &CompositionConfig, ctx: &QueryContext) -> EngineResult<BuiltQuery> {
    let built = Composer::new(config, ctx).build()?;
    tracing::debug!(
        target: "collage.sql",
        sql = %built.sql,
        params = built.values.len(),
        "composition query built"
    );
    Ok(built)
}

struct Composer<'a> {
    config: &'a CompositionConfig,
    ctx: &'a QueryContext,
    /// Joined-collection slug → table alias, derived from the join list
    join_aliases: HashMap<String, String>,
    values: Vec<BindValue>,
}

impl<'a> Composer<'a> {
    fn new(config: &'a CompositionConfig, ctx: &'a QueryContext) -> Self {
        Self {
            config,
            ctx,
            join_aliases: HashMap::new(),
            values: Vec::new(),
        }
    }

    fn build(mut self) -> EngineResult<BuiltQuery> {
        self.resolve_join_aliases()?;

        // Clause order is also parameter order: SELECT binds nothing, each
        // JOIN binds workspace+collection, WHERE binds workspace+collection
        // then filters, LIMIT binds last.
        let select = self.select_clause()?;
        let from = format!("FROM {RECORDS_TABLE} {SOURCE_ALIAS}");
        let joins = self.join_clauses()?;
        let where_clause = self.where_clause()?;
        let group_by = self.group_by_clause()?;
        let order_by = self.order_by_clause()?;
        let limit = self.limit_clause()?;

        let mut parts = vec![select, from];
        parts.extend(joins);
        parts.push(where_clause);
        parts.extend(group_by);
        parts.extend(order_by);
        parts.extend(limit);

        Ok(BuiltQuery {
            sql: parts.join("\n"),
            values: self.values,
        })
    }

    /// Append a value; returns its 1-based placeholder index.
    fn push(&mut self, value: BindValue) -> usize {
        self.values.push(value);
        self.values.len()
    }

    fn resolve_join_aliases(&mut self) -> EngineResult<()> {
        for join in &self.config.joins {
            if !self.ctx.joined_collections.contains_key(&join.collection) {
                return Err(EngineError::JoinCollectionNotFound(join.collection.clone()));
            }
            let slug = join.collection.to_lowercase();
            let alias = format!("j_{}", sanitize(&slug)?);
            self.join_aliases.insert(join.collection.clone(), alias);
        }
        Ok(())
    }

    // ==================== SELECT ====================

    fn select_clause(&self) -> EngineResult<String> {
        let mut cols: Vec<String> = Vec::new();
        let mut projected: Vec<&str> = Vec::new();

        for raw in &self.config.select {
            cols.push(self.projection(raw)?);
            projected.push(raw);
        }

        // groupBy expressions are auto-projected; ones already selected
        // explicitly are not repeated.
        for raw in &self.config.group_by {
            if projected.iter().any(|p| p == raw) {
                continue;
            }
            cols.push(self.projection(raw)?);
            projected.push(raw);
        }

        for agg in &self.config.aggregations {
            cols.push(self.aggregation_column(agg)?);
        }

        if cols.is_empty() {
            // Raw source columns when nothing is projected.
            cols = ["id", "data", "created_at", "updated_at"]
                .iter()
                .map(|c| format!("{SOURCE_ALIAS}.{c}"))
                .collect();
        }

        Ok(format!("SELECT {}", cols.join(", ")))
    }

    fn projection(&self, raw: &str) -> EngineResult<String> {
        let expr = FieldExpr::parse(raw)?;
        let sql = expr.to_sql(SOURCE_ALIAS, &self.join_aliases)?;
        Ok(format!("{sql} AS {}", output_alias(raw)))
    }

    fn aggregation_column(&self, agg: &AggregationSpec) -> EngineResult<String> {
        let alias = sanitize(&agg.alias)?;
        let sql = match agg.function.as_str() {
            "count" if agg.field == "*" => "COUNT(*)".to_string(),
            // Counts non-null JSON extractions, which includes the JSON
            // text "null"; this follows text-extraction semantics, not
            // SQL NULL semantics.
            "count" => format!("COUNT({SOURCE_ALIAS}.data->>'{}')", sanitize(&agg.field)?),
            "sum" | "avg" | "min" | "max" => format!(
                "{}(({SOURCE_ALIAS}.data->>'{}')::numeric)",
                agg.function.to_uppercase(),
                sanitize(&agg.field)?
            ),
            other => return Err(EngineError::UnknownFunction(other.to_string())),
        };
        Ok(format!("{sql} AS {alias}"))
    }

    // ==================== JOINs ====================

    fn join_clauses(&mut self) -> EngineResult<Vec<String>> {
        let mut out = Vec::with_capacity(self.config.joins.len());
        for join in &self.config.joins {
            let kind = match join.join_type.as_str() {
                "inner" => "INNER",
                "left" => "LEFT",
                "right" => "RIGHT",
                other => return Err(EngineError::UnknownJoinType(other.to_string())),
            };
            let alias = self.join_aliases[&join.collection].clone();
            let collection_id = self.ctx.joined_collections[&join.collection].clone();
            let left = sanitize(&join.on.left)?.to_string();
            let right = sanitize(&join.on.right)?.to_string();

            let workspace_param = self.push(BindValue::Text(self.ctx.workspace_id.clone()));
            let collection_param = self.push(BindValue::Text(collection_id));

            out.push(format!(
                "{kind} JOIN {RECORDS_TABLE} {alias} ON {alias}.workspace_id = ${workspace_param} \
                 AND {alias}.collection_id = ${collection_param} \
                 AND {SOURCE_ALIAS}.data->>'{left}' = {alias}.data->>'{right}'"
            ));
        }
        Ok(out)
    }

    // ==================== WHERE ====================

    fn where_clause(&mut self) -> EngineResult<String> {
        let mut conditions = Vec::with_capacity(2 + self.config.filters.len());

        let workspace_param = self.push(BindValue::Text(self.ctx.workspace_id.clone()));
        conditions.push(format!("{SOURCE_ALIAS}.workspace_id = ${workspace_param}"));
        let collection_param = self.push(BindValue::Text(self.ctx.collection_id.clone()));
        conditions.push(format!("{SOURCE_ALIAS}.collection_id = ${collection_param}"));

        for filter in &self.config.filters {
            let Some(value) = self.filter_value(filter)? else {
                continue;
            };
            conditions.push(self.filter_condition(filter, &value)?);
        }

        Ok(format!("WHERE {}", conditions.join(" AND ")))
    }

    /// Resolve the comparison value for a filter.
    ///
    /// A filter that names a `param` reads the request bag; when the key is
    /// absent the whole filter is dropped, which is how optional query
    /// parameters work. Callers relying on a filter for scoping must use a
    /// literal `value` instead.
    fn filter_value(&self, filter: &FilterSpec) -> EngineResult<Option<Value>> {
        if let Some(key) = &filter.param {
            return match self.ctx.params.get(key) {
                Some(value) => Ok(Some(value.clone())),
                None => {
                    tracing::debug!(
                        target: "collage.sql",
                        field = %filter.field,
                        param = %key,
                        "filter dropped: parameter absent from bag"
                    );
                    Ok(None)
                }
            };
        }
        match &filter.value {
            Some(value) => Ok(Some(value.clone())),
            None => Err(EngineError::FilterRequiresValue(filter.field.clone())),
        }
    }

    fn filter_condition(&mut self, filter: &FilterSpec, value: &Value) -> EngineResult<String> {
        let field = sanitize(&filter.field)?.to_string();
        match filter.operator.as_str() {
            "eq" => {
                let p = self.push(BindValue::Text(text_of(value)));
                Ok(format!("{SOURCE_ALIAS}.data->>'{field}' = ${p}"))
            }
            "neq" => {
                let p = self.push(BindValue::Text(text_of(value)));
                Ok(format!("{SOURCE_ALIAS}.data->>'{field}' != ${p}"))
            }
            "gt" | "gte" | "lt" | "lte" => {
                let op = match filter.operator.as_str() {
                    "gt" => ">",
                    "gte" => ">=",
                    "lt" => "<",
                    _ => "<=",
                };
                let number = numeric_of(&field, value)?;
                let p = self.push(BindValue::Number(number));
                Ok(format!("({SOURCE_ALIAS}.data->>'{field}')::numeric {op} ${p}"))
            }
            "contains" => {
                let p = self.push(BindValue::Text(format!("%{}%", text_of(value))));
                Ok(format!("{SOURCE_ALIAS}.data->>'{field}' ILIKE ${p}"))
            }
            "in" => {
                let Some(items) = value.as_array() else {
                    return Err(EngineError::InOperatorRequiresArray);
                };
                if items.is_empty() {
                    return Err(EngineError::InOperatorRequiresArray);
                }
                let placeholders: Vec<String> = items
                    .iter()
                    .map(|item| {
                        let p = self.push(BindValue::Text(text_of(item)));
                        format!("${p}")
                    })
                    .collect();
                Ok(format!(
                    "{SOURCE_ALIAS}.data->>'{field}' IN ({})",
                    placeholders.join(", ")
                ))
            }
            other => Err(EngineError::UnknownOperator(other.to_string())),
        }
    }

    // ==================== GROUP BY / ORDER BY / LIMIT ====================

    fn group_by_clause(&self) -> EngineResult<Option<String>> {
        if self.config.group_by.is_empty() {
            return Ok(None);
        }
        let mut exprs = Vec::with_capacity(self.config.group_by.len());
        for raw in &self.config.group_by {
            let expr = FieldExpr::parse(raw)?;
            exprs.push(expr.to_sql(SOURCE_ALIAS, &self.join_aliases)?);
        }
        Ok(Some(format!("GROUP BY {}", exprs.join(", "))))
    }

    fn order_by_clause(&self) -> EngineResult<Option<String>> {
        if self.config.sort.is_empty() {
            return Ok(None);
        }
        let mut entries = Vec::with_capacity(self.config.sort.len());
        for sort in &self.config.sort {
            let direction = match sort.direction.as_str() {
                "asc" => "ASC",
                "desc" => "DESC",
                other => return Err(EngineError::UnknownDirection(other.to_string())),
            };

            // Resolution order: a groupBy expression sorts by its projected
            // alias, an aggregation alias is used verbatim, anything else is
            // a fresh expression.
            let key = if self.config.group_by.iter().any(|g| g == &sort.field) {
                output_alias(&sort.field)
            } else if self
                .config
                .aggregations
                .iter()
                .any(|agg| agg.alias == sort.field)
            {
                sort.field.clone()
            } else {
                let expr = FieldExpr::parse(&sort.field)?;
                expr.to_sql(SOURCE_ALIAS, &self.join_aliases)?
            };

            entries.push(format!("{key} {direction}"));
        }
        Ok(Some(format!("ORDER BY {}", entries.join(", "))))
    }

    fn limit_clause(&mut self) -> EngineResult<Option<String>> {
        let Some(limit) = self.config.limit else {
            return Ok(None);
        };
        if limit <= 0 {
            return Err(EngineError::validation("limit must be a positive integer"));
        }
        let p = self.push(BindValue::Int(limit));
        Ok(Some(format!("LIMIT ${p}")))
    }
}

/// Coerce a JSON value to its text comparison form.
///
/// `->>` extraction yields the JSON scalar's text rendering, so non-string
/// literals compare by the same rendering.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Coerce a JSON value to a decimal for the `::numeric` comparison family.
fn numeric_of(field: &str, value: &Value) -> EngineResult<Decimal> {
    let number = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    };
    number.ok_or_else(|| {
        EngineError::validation(format!("filter on '{field}' expects a numeric value"))
    })
}
