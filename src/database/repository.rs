use serde_json::{Map, Value};
use sqlx::PgPool;
use std::marker::PhantomData;

use crate::config::SearchConfig;
use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::database::search::{self, SearchResult};
use crate::database::statements::{exists, Statements};
use crate::database::value::{bind_query_as, SqlValue};

/// Load, write and search one entity table.
///
/// Writes go through [`Statements`] so each call is a single transaction.
/// Results follow the affected-rows convention: `>0` done, `0` not found,
/// `-1` version conflict.
pub struct Repository<T> {
    pool: PgPool,
    _phantom: PhantomData<T>,
}

impl<T: Entity> Repository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, _phantom: PhantomData }
    }

    pub async fn load(&self, keys: &[SqlValue]) -> Result<Option<T>, DatabaseError> {
        let sql = T::schema().select_by_key();
        let mut q = sqlx::query_as::<_, T>(&sql);
        for k in keys {
            q = bind_query_as(q, k);
        }
        Ok(q.fetch_optional(&self.pool).await?)
    }

    pub async fn create(&self, entity: &T) -> Result<i64, DatabaseError> {
        let mut sts = Statements::new(true);
        sts.add(T::schema().insert(entity.values()));
        sts.exec(&self.pool).await
    }

    pub async fn update(&self, entity: &T) -> Result<i64, DatabaseError> {
        let values = entity.values();
        let keys = T::schema().key_values(&values);
        let mut sts = Statements::new(true);
        sts.add(T::schema().update(values));
        let affected = sts.exec(&self.pool).await?;
        self.resolve_missed(affected, &keys).await
    }

    pub async fn patch(&self, payload: &Map<String, Value>) -> Result<i64, DatabaseError> {
        let keys = T::schema().keys_from_json(payload)?;
        let statement = T::schema().patch(payload)?.ok_or(DatabaseError::EmptyPatch)?;
        let mut sts = Statements::new(true);
        sts.add(statement);
        let affected = sts.exec(&self.pool).await?;
        self.resolve_missed(affected, &keys).await
    }

    pub async fn delete(&self, keys: Vec<SqlValue>) -> Result<i64, DatabaseError> {
        let mut sts = Statements::new(true);
        sts.add(T::schema().delete(keys));
        sts.exec(&self.pool).await
    }

    pub async fn search(&self, filter: &T::Filter, config: &SearchConfig) -> Result<SearchResult<T>, DatabaseError> {
        search::search(&self.pool, T::schema(), filter, config).await
    }

    /// A versioned write that touched nothing is a conflict when the row
    /// still exists, otherwise the row is gone.
    async fn resolve_missed(&self, affected: i64, keys: &[SqlValue]) -> Result<i64, DatabaseError> {
        if affected > 0 || T::schema().version_column().is_none() {
            return Ok(affected);
        }
        if exists(&self.pool, &T::schema().exists_by_key(), keys).await? {
            Ok(-1)
        } else {
            Ok(0)
        }
    }
}
