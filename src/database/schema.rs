//! Table descriptors and the SQL statement builders driven by them.
//!
//! Every persisted struct declares a static [`TableSchema`] listing its
//! columns in the same order as the values it hands to the builders. Column
//! and table names only ever come from these static descriptors; payload data
//! is always bound as `$n` parameters.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::manager::DatabaseError;
use super::statements::Statement;
use super::value::SqlValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Int4,
    Int8,
    Bool,
    Timestamp,
    TextArray,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub json: &'static str,
    pub kind: ColumnKind,
    pub key: bool,
    /// Written on insert only, never by update or patch
    pub insert_only: bool,
    /// Optimistic-concurrency counter
    pub version: bool,
}

impl Column {
    pub const fn new(name: &'static str, json: &'static str, kind: ColumnKind) -> Self {
        Self { name, json, kind, key: false, insert_only: false, version: false }
    }

    pub const fn key(self) -> Self {
        Self { key: true, ..self }
    }

    pub const fn insert_only(self) -> Self {
        Self { insert_only: true, ..self }
    }

    pub const fn version(self) -> Self {
        Self { version: true, ..self }
    }
}

#[derive(Debug)]
pub struct TableSchema {
    pub table: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    pub fn keys(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.key)
    }

    pub fn version_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.version)
    }

    pub fn by_json(&self, json: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.json == json)
    }

    pub fn column_list(&self) -> String {
        self.columns.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
    }

    fn key_predicate(&self, first_param: usize) -> String {
        self.keys()
            .enumerate()
            .map(|(i, c)| format!("{} = ${}", c.name, first_param + i))
            .collect::<Vec<_>>()
            .join(" and ")
    }

    /// The key parameters out of a full row of values in column order
    pub fn key_values(&self, values: &[SqlValue]) -> Vec<SqlValue> {
        self.columns
            .iter()
            .zip(values)
            .filter(|(c, _)| c.key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Key parameters out of a JSON payload; every key must be present
    pub fn keys_from_json(&self, payload: &Map<String, Value>) -> Result<Vec<SqlValue>, DatabaseError> {
        self.keys()
            .map(|c| {
                let v = payload.get(c.json).ok_or_else(|| DatabaseError::MissingKey(c.json.to_string()))?;
                SqlValue::from_json(c.kind, c.json, v)
            })
            .collect()
    }

    /// Key parameters looked up by JSON name, as they arrive in a URL path
    pub fn keys_from_path(&self, path: &HashMap<String, String>) -> Result<Vec<SqlValue>, DatabaseError> {
        self.keys()
            .map(|c| {
                let raw = path.get(c.json).ok_or_else(|| DatabaseError::MissingKey(c.json.to_string()))?;
                SqlValue::from_json(c.kind, c.json, &Value::String(raw.clone()))
            })
            .collect()
    }

    /// `insert into t (..) values ($1, ..)`. A version column starts at 1.
    pub fn insert(&self, values: Vec<SqlValue>) -> Statement {
        debug_assert_eq!(values.len(), self.columns.len());
        let args: Vec<SqlValue> = self
            .columns
            .iter()
            .zip(values)
            .map(|(c, v)| if c.version { SqlValue::Int4(Some(1)) } else { v })
            .collect();
        let placeholders = (1..=args.len()).map(|i| format!("${}", i)).collect::<Vec<_>>().join(", ");
        Statement::new(
            format!("insert into {} ({}) values ({})", self.table, self.column_list(), placeholders),
            args,
        )
    }

    /// One multi-row insert for all `rows`; `None` when there is nothing to insert.
    pub fn insert_batch(&self, rows: Vec<Vec<SqlValue>>) -> Option<Statement> {
        if rows.is_empty() {
            return None;
        }
        let width = self.columns.len();
        let mut args = Vec::with_capacity(rows.len() * width);
        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            debug_assert_eq!(row.len(), width);
            let start = args.len();
            tuples.push(format!(
                "({})",
                (1..=width).map(|i| format!("${}", start + i)).collect::<Vec<_>>().join(", ")
            ));
            args.extend(row);
        }
        Some(Statement::new(
            format!("insert into {} ({}) values {}", self.table, self.column_list(), tuples.join(", ")),
            args,
        ))
    }

    /// Full-row update of every non-key, non-insert-only column. With a
    /// version column the row must still carry the submitted version.
    pub fn update(&self, values: Vec<SqlValue>) -> Statement {
        let keys = self.key_values(&values);
        let mut sets = Vec::new();
        let mut args = Vec::new();
        let mut expected_version = None;
        for (c, v) in self.columns.iter().zip(values) {
            if c.key || c.insert_only {
                continue;
            }
            if c.version {
                expected_version = Some(v);
                sets.push(format!("{0} = {0} + 1", c.name));
                continue;
            }
            args.push(v);
            sets.push(format!("{} = ${}", c.name, args.len()));
        }
        let mut predicate = self.key_predicate(args.len() + 1);
        args.extend(keys);
        if let (Some(column), Some(version)) = (self.version_column(), expected_version) {
            args.push(version);
            predicate = format!("{} and {} = ${}", predicate, column.name, args.len());
        }
        Statement::new(format!("update {} set {} where {}", self.table, sets.join(", "), predicate), args)
    }

    /// Update only the columns present in a JSON payload. Every key column
    /// must be present; keys with no matching column are ignored. Returns
    /// `None` when the payload names no updatable column.
    pub fn patch(&self, payload: &Map<String, Value>) -> Result<Option<Statement>, DatabaseError> {
        let keys = self.keys_from_json(payload)?;

        let mut sets = Vec::new();
        let mut args = Vec::new();
        let mut expected_version = None;
        for c in self.columns.iter().filter(|c| !c.key && !c.insert_only) {
            let Some(v) = payload.get(c.json) else { continue };
            if c.version {
                expected_version = Some(SqlValue::from_json(c.kind, c.json, v)?);
                continue;
            }
            args.push(SqlValue::from_json(c.kind, c.json, v)?);
            sets.push(format!("{} = ${}", c.name, args.len()));
        }
        if sets.is_empty() {
            return Ok(None);
        }
        if let Some(column) = self.version_column() {
            sets.push(format!("{0} = {0} + 1", column.name));
        }

        let mut predicate = self.key_predicate(args.len() + 1);
        args.extend(keys);
        if let (Some(column), Some(version)) = (self.version_column(), expected_version) {
            args.push(version);
            predicate = format!("{} and {} = ${}", predicate, column.name, args.len());
        }
        Ok(Some(Statement::new(
            format!("update {} set {} where {}", self.table, sets.join(", "), predicate),
            args,
        )))
    }

    pub fn delete(&self, keys: Vec<SqlValue>) -> Statement {
        Statement::new(format!("delete from {} where {}", self.table, self.key_predicate(1)), keys)
    }

    pub fn select_by_key(&self) -> String {
        format!("select {} from {} where {} limit 1", self.column_list(), self.table, self.key_predicate(1))
    }

    pub fn exists_by_key(&self) -> String {
        let first = self.keys().next().map(|c| c.name).unwrap_or("1");
        format!("select {} from {} where {} limit 1", first, self.table, self.key_predicate(1))
    }
}
