//! Filter-to-WHERE building and the count + page query pattern shared by
//! every searchable table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{postgres::PgRow, FromRow, PgPool};
use std::collections::HashMap;
use tracing::warn;

use super::manager::DatabaseError;
use super::schema::TableSchema;
use super::value::{bind_query_as, bind_query_scalar, SqlValue};
use crate::config::SearchConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub min: Option<DateTime<Utc>>,
    pub max: Option<DateTime<Utc>>,
}

/// Paging parameters common to every filter. `page` starts at 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub limit: Option<i64>,
    pub sort: Option<String>,
}

/// Deserializers that accept both the JSON form of a value and the string
/// form it takes in a query string.
pub mod lenient {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrString {
        List(Vec<String>),
        Str(String),
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Option::<IntOrString>::deserialize(d)? {
            None => Ok(None),
            Some(IntOrString::Int(n)) => Ok(Some(n)),
            Some(IntOrString::Str(s)) if s.trim().is_empty() => Ok(None),
            Some(IntOrString::Str(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
        }
    }

    /// `["a","b"]` or `"a,b"`
    pub fn opt_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
        Ok(match Option::<ListOrString>::deserialize(d)? {
            None => None,
            Some(ListOrString::List(v)) => Some(v),
            Some(ListOrString::Str(s)) => Some(
                s.split(',').map(str::trim).filter(|p| !p.is_empty()).map(str::to_string).collect(),
            ),
        })
    }
}

/// Fold query-string pairs into a JSON object. Dotted keys nest, so
/// `publishedAt.min=..` becomes `{"publishedAt": {"min": ..}}`.
pub fn query_to_json(params: HashMap<String, String>) -> Value {
    let mut root = Map::new();
    for (key, value) in params {
        match key.split_once('.') {
            Some((outer, inner)) => {
                let entry = root.entry(outer.to_string()).or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(obj) = entry {
                    obj.insert(inner.to_string(), Value::String(value));
                }
            }
            None => {
                root.insert(key, Value::String(value));
            }
        }
    }
    Value::Object(root)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult<T> {
    pub list: Vec<T>,
    pub total: i64,
}

impl<T> SearchResult<T> {
    pub fn empty() -> Self {
        Self { list: Vec::new(), total: 0 }
    }
}

/// Accumulates `$n` parameterised predicates joined with `and`.
#[derive(Debug, Default)]
pub struct WhereBuilder {
    conditions: Vec<String>,
    params: Vec<SqlValue>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn param(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    pub fn eq(&mut self, column: &str, value: Option<impl Into<SqlValue>>) -> &mut Self {
        if let Some(v) = value.map(Into::into) {
            if !is_blank(&v) {
                let p = self.param(v);
                self.conditions.push(format!("{} = {}", column, p));
            }
        }
        self
    }

    /// `column like 'value%'`, case-insensitive when `ilike` is set
    pub fn prefix(&mut self, column: &str, value: Option<&str>, ilike: bool) -> &mut Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            let p = self.param(format!("{}%", escape_like(v)).into());
            let op = if ilike { "ilike" } else { "like" };
            self.conditions.push(format!("{} {} {}", column, op, p));
        }
        self
    }

    pub fn contains(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            let p = self.param(format!("%{}%", escape_like(v)).into());
            self.conditions.push(format!("{} ilike {}", column, p));
        }
        self
    }

    pub fn time_range(&mut self, column: &str, range: Option<&TimeRange>) -> &mut Self {
        if let Some(r) = range {
            if let Some(min) = r.min {
                let p = self.param(min.into());
                self.conditions.push(format!("{} >= {}", column, p));
            }
            if let Some(max) = r.max {
                let p = self.param(max.into());
                self.conditions.push(format!("{} <= {}", column, p));
            }
        }
        self
    }

    /// `column = any($n)`; an empty list adds no condition
    pub fn any(&mut self, column: &str, values: Option<&[String]>) -> &mut Self {
        if let Some(vs) = values.filter(|vs| !vs.is_empty()) {
            let p = self.param(vs.to_vec().into());
            self.conditions.push(format!("{} = any({})", column, p));
        }
        self
    }

    /// Array column shares at least one element with `values`
    pub fn overlaps(&mut self, column: &str, values: Option<&[String]>) -> &mut Self {
        if let Some(vs) = values.filter(|vs| !vs.is_empty()) {
            let p = self.param(vs.to_vec().into());
            self.conditions.push(format!("{} && {}", column, p));
        }
        self
    }

    pub fn build(self) -> (String, Vec<SqlValue>) {
        if self.conditions.is_empty() {
            (String::new(), self.params)
        } else {
            (format!(" where {}", self.conditions.join(" and ")), self.params)
        }
    }
}

fn is_blank(v: &SqlValue) -> bool {
    match v {
        SqlValue::Text(Some(s)) => s.is_empty(),
        other => other.is_null(),
    }
}

fn escape_like(v: &str) -> String {
    v.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Turn a sort expression such as `-publishedAt,title` or `title desc` into
/// an `order by` clause. Field names are JSON names resolved through the
/// schema; anything unknown is rejected.
pub fn order_by(schema: &TableSchema, sort: Option<&str>) -> Result<String, DatabaseError> {
    let Some(sort) = sort.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(String::new());
    };
    let mut parts = Vec::new();
    for token in sort.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (field, desc) = match token.strip_prefix('-') {
            Some(rest) => (rest.trim(), true),
            None => {
                let mut it = token.split_whitespace();
                let field = it.next().unwrap_or_default();
                let dir = it.next().unwrap_or("asc");
                (field, dir.eq_ignore_ascii_case("desc"))
            }
        };
        let column = schema
            .by_json(field)
            .ok_or_else(|| DatabaseError::UnknownField(field.to_string()))?;
        parts.push(format!("{} {}", column.name, if desc { "desc" } else { "asc" }));
    }
    if parts.is_empty() {
        return Ok(String::new());
    }
    Ok(format!(" order by {}", parts.join(", ")))
}

/// The resolved limit and offset of a page, or `None` when nothing should be
/// fetched at all. An offset past `i64::MAX` saturates, which yields an
/// empty page.
pub fn resolve_page(paging: &Paging, config: &SearchConfig) -> Option<(i64, i64)> {
    let mut limit = paging.limit.unwrap_or(config.default_limit);
    if limit <= 0 {
        return None;
    }
    if limit > config.max_limit {
        warn!(requested = limit, max = config.max_limit, "search limit capped");
        limit = config.max_limit;
    }
    let page = paging.page.filter(|p| *p > 0).unwrap_or(1);
    Some((limit, limit.checked_mul(page - 1).unwrap_or(i64::MAX)))
}

/// Builds the filtered select for one table
pub trait SearchFilter {
    fn paging(&self) -> &Paging;

    /// Where clause (with its leading ` where`) and its parameters
    fn to_where(&self) -> (String, Vec<SqlValue>);

    /// Applied when the caller gives no sort
    fn default_sort(&self) -> Option<&'static str> {
        None
    }
}

/// Count the matches of `filter` on `schema`, then fetch the requested page.
/// The page query is skipped when nothing matches.
pub async fn search<T, F>(
    pool: &PgPool,
    schema: &TableSchema,
    filter: &F,
    config: &SearchConfig,
) -> Result<SearchResult<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    F: SearchFilter,
{
    let Some((limit, offset)) = resolve_page(filter.paging(), config) else {
        return Ok(SearchResult::empty());
    };
    let sort = filter.paging().sort.as_deref().or(filter.default_sort());
    let order = order_by(schema, sort)?;
    let (predicate, params) = filter.to_where();
    let query = format!("select {} from {}{}", schema.column_list(), schema.table, predicate);

    let count_sql = format!("select count(*) from ({}) as main", query);
    let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
    for p in &params {
        count = bind_query_scalar(count, p);
    }
    let total = count.fetch_one(pool).await?;
    if total == 0 {
        return Ok(SearchResult::empty());
    }

    let page_sql = format!("{}{} limit {} offset {}", query, order, limit, offset);
    let mut page = sqlx::query_as::<_, T>(&page_sql);
    for p in &params {
        page = bind_query_as(page, p);
    }
    let list = page.fetch_all(pool).await?;
    Ok(SearchResult { list, total })
}
