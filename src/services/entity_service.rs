use serde_json::{Map, Value};
use sqlx::PgPool;

use crate::config::SearchConfig;
use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::database::repository::Repository;
use crate::database::search::SearchResult;
use crate::database::value::SqlValue;

/// CRUD and search over one entity table
pub struct EntityService<T> {
    repository: Repository<T>,
    search: SearchConfig,
}

impl<T: Entity> EntityService<T> {
    pub fn new(pool: PgPool, search: SearchConfig) -> Self {
        Self { repository: Repository::new(pool), search }
    }

    pub async fn load(&self, keys: &[SqlValue]) -> Result<Option<T>, DatabaseError> {
        self.repository.load(keys).await
    }

    pub async fn create(&self, entity: &T) -> Result<i64, DatabaseError> {
        self.repository.create(entity).await
    }

    pub async fn update(&self, entity: &T) -> Result<i64, DatabaseError> {
        self.repository.update(entity).await
    }

    pub async fn patch(&self, payload: &Map<String, Value>) -> Result<i64, DatabaseError> {
        self.repository.patch(payload).await
    }

    pub async fn delete(&self, keys: Vec<SqlValue>) -> Result<i64, DatabaseError> {
        self.repository.delete(keys).await
    }

    pub async fn search(&self, filter: &T::Filter) -> Result<SearchResult<T>, DatabaseError> {
        self.repository.search(filter, &self.search).await
    }
}
