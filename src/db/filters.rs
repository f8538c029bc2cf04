//! Conjunctive `WHERE` clause builder shared by every read and write path.
//!
//! Callers hand over a uniform superset of optional filters; fields outside
//! [`ALLOWED_FIELDS`] and `None` values are dropped without error. Values are
//! always bound as parameters, never written into the SQL text.

use sqlx::Sqlite;
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::SqliteArguments;
use tracing::debug;

pub const ALLOWED_FIELDS: [&str; 4] = ["id", "name", "status", "poll_id"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
    IntList(Vec<i64>),
    TextList(Vec<String>),
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(v: Vec<i64>) -> Self {
        FilterValue::IntList(v)
    }
}

impl From<&[i64]> for FilterValue {
    fn from(v: &[i64]) -> Self {
        FilterValue::IntList(v.to_vec())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(v: Vec<String>) -> Self {
        FilterValue::TextList(v)
    }
}

/// A scalar parameter in bind order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, Default)]
pub struct Filters {
    conditions: Vec<(String, FilterValue)>,
    order_by: Option<&'static str>,
    limit: Option<i64>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<V: Into<FilterValue>>(mut self, field: &str, value: V) -> Self {
        self.conditions.push((field.to_string(), value.into()));
        self
    }

    pub fn with_opt<V: Into<FilterValue>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(field, v),
            None => self,
        }
    }

    /// Static ordering clause, placed ahead of the limit.
    pub fn order_by(mut self, clause: &'static str) -> Self {
        self.order_by = Some(clause);
        self
    }

    /// Non-positive limits mean "no limit".
    pub fn limit(mut self, limit: Option<i64>) -> Self {
        self.limit = limit.filter(|l| *l > 0);
        self
    }

    /// Appends the filters to `base`, which must already end in a `WHERE`
    /// clause (`WHERE 1=1` when there is nothing else to match on).
    pub fn compile(&self, base: &str) -> CompiledQuery {
        let mut sections = vec![base.trim().to_string()];
        let mut params = Vec::new();
        let mut used = Vec::new();

        for (field, value) in &self.conditions {
            let Some(column) = ALLOWED_FIELDS.iter().find(|f| **f == field.as_str()) else {
                continue;
            };
            used.push(*column);

            match value {
                FilterValue::Int(v) => {
                    sections.push(format!("AND {column} = ?"));
                    params.push(Param::Int(*v));
                }
                FilterValue::Text(v) => {
                    sections.push(format!("AND {column} = ?"));
                    params.push(Param::Text(v.clone()));
                }
                FilterValue::IntList(vs) => {
                    sections.push(in_clause(column, vs.len()));
                    params.extend(vs.iter().map(|v| Param::Int(*v)));
                }
                FilterValue::TextList(vs) => {
                    sections.push(in_clause(column, vs.len()));
                    params.extend(vs.iter().cloned().map(Param::Text));
                }
            }
        }

        if let Some(clause) = self.order_by {
            sections.push(format!("ORDER BY {clause}"));
        }
        if let Some(limit) = self.limit {
            sections.push("LIMIT ?".to_string());
            params.push(Param::Int(limit));
        }

        debug!("Extended query with fields: {:?}", used);

        CompiledQuery {
            sql: sections.join("\n"),
            params,
        }
    }
}

fn in_clause(column: &str, len: usize) -> String {
    if len == 0 {
        return "AND 1=0".to_string();
    }
    let placeholders = vec!["?"; len].join(", ");
    format!("AND {column} IN ({placeholders})")
}

pub fn bind_query<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[Param],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Param::Int(v) => query.bind(*v),
            Param::Text(v) => query.bind(v.clone()),
        };
    }
    query
}

pub fn bind_query_as<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    params: &[Param],
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Param::Int(v) => query.bind(*v),
            Param::Text(v) => query.bind(v.clone()),
        };
    }
    query
}
