use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgRow, FromRow};
use validator::Validate;

use super::schema::TableSchema;
use super::search::SearchFilter;
use super::value::SqlValue;

/// A table-backed record served through the generic CRUD routes.
pub trait Entity:
    for<'r> FromRow<'r, PgRow> + Serialize + DeserializeOwned + Validate + Send + Sync + Unpin + 'static
{
    type Filter: SearchFilter + DeserializeOwned + Send + Sync + 'static;

    /// Name used for privilege checks and audit records
    const MODULE: &'static str;

    fn schema() -> &'static TableSchema;

    /// Column values in the order of `schema().columns`
    fn values(&self) -> Vec<SqlValue>;
}
