use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgArguments;

use super::schema::ColumnKind;
use crate::database::manager::DatabaseError;

/// A bind parameter that keeps its Postgres type even when null, so that a
/// `NULL` written into a `timestamptz` column is sent as a timestamp, not text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Int4(Option<i32>),
    Int8(Option<i64>),
    Bool(Option<bool>),
    Timestamp(Option<DateTime<Utc>>),
    TextArray(Option<Vec<String>>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        match self {
            SqlValue::Text(v) => v.is_none(),
            SqlValue::Int4(v) => v.is_none(),
            SqlValue::Int8(v) => v.is_none(),
            SqlValue::Bool(v) => v.is_none(),
            SqlValue::Timestamp(v) => v.is_none(),
            SqlValue::TextArray(v) => v.is_none(),
        }
    }

    pub fn null_of(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Text => SqlValue::Text(None),
            ColumnKind::Int4 => SqlValue::Int4(None),
            ColumnKind::Int8 => SqlValue::Int8(None),
            ColumnKind::Bool => SqlValue::Bool(None),
            ColumnKind::Timestamp => SqlValue::Timestamp(None),
            ColumnKind::TextArray => SqlValue::TextArray(None),
        }
    }

    /// Convert a JSON payload value into the parameter type of a column.
    /// `field` is the JSON name, used in the error message.
    pub fn from_json(kind: ColumnKind, field: &str, value: &Value) -> Result<Self, DatabaseError> {
        if value.is_null() {
            return Ok(Self::null_of(kind));
        }
        let invalid = |expected: &'static str| DatabaseError::InvalidField {
            field: field.to_string(),
            expected,
        };
        match kind {
            ColumnKind::Text => value
                .as_str()
                .map(|s| SqlValue::Text(Some(s.to_string())))
                .ok_or_else(|| invalid("string")),
            ColumnKind::Int4 => value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(|n| SqlValue::Int4(Some(n)))
                .ok_or_else(|| invalid("32-bit integer")),
            ColumnKind::Int8 => value
                .as_i64()
                .map(|n| SqlValue::Int8(Some(n)))
                .ok_or_else(|| invalid("integer")),
            ColumnKind::Bool => value
                .as_bool()
                .map(|b| SqlValue::Bool(Some(b)))
                .ok_or_else(|| invalid("boolean")),
            ColumnKind::Timestamp => value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| SqlValue::Timestamp(Some(t.with_timezone(&Utc))))
                .ok_or_else(|| invalid("RFC 3339 timestamp")),
            ColumnKind::TextArray => {
                let items = value.as_array().ok_or_else(|| invalid("array of strings"))?;
                items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .map(|v| SqlValue::TextArray(Some(v)))
                    .ok_or_else(|| invalid("array of strings"))
            }
        }
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int4(Some(v))
    }
}

impl From<Option<i32>> for SqlValue {
    fn from(v: Option<i32>) -> Self {
        SqlValue::Int4(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int8(Some(v))
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        SqlValue::Int8(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(Some(v))
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(Some(v))
    }
}

impl From<Option<DateTime<Utc>>> for SqlValue {
    fn from(v: Option<DateTime<Utc>>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(v: Vec<String>) -> Self {
        SqlValue::TextArray(Some(v))
    }
}

impl From<Option<Vec<String>>> for SqlValue {
    fn from(v: Option<Vec<String>>) -> Self {
        SqlValue::TextArray(v)
    }
}

pub fn bind_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &SqlValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v.clone() {
        SqlValue::Text(v) => q.bind(v),
        SqlValue::Int4(v) => q.bind(v),
        SqlValue::Int8(v) => q.bind(v),
        SqlValue::Bool(v) => q.bind(v),
        SqlValue::Timestamp(v) => q.bind(v),
        SqlValue::TextArray(v) => q.bind(v),
    }
}

pub fn bind_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &SqlValue,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
{
    match v.clone() {
        SqlValue::Text(v) => q.bind(v),
        SqlValue::Int4(v) => q.bind(v),
        SqlValue::Int8(v) => q.bind(v),
        SqlValue::Bool(v) => q.bind(v),
        SqlValue::Timestamp(v) => q.bind(v),
        SqlValue::TextArray(v) => q.bind(v),
    }
}

pub fn bind_query_scalar<'q, O>(
    q: sqlx::query::QueryScalar<'q, sqlx::Postgres, O, PgArguments>,
    v: &SqlValue,
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, O, PgArguments> {
    match v.clone() {
        SqlValue::Text(v) => q.bind(v),
        SqlValue::Int4(v) => q.bind(v),
        SqlValue::Int8(v) => q.bind(v),
        SqlValue::Bool(v) => q.bind(v),
        SqlValue::Timestamp(v) => q.bind(v),
        SqlValue::TextArray(v) => q.bind(v),
    }
}
