use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::{RoleConfig, SearchConfig};
use crate::database::manager::DatabaseError;
use crate::database::models::privilege::Privilege;
use crate::database::models::role::{Role, RoleCode, RoleFilter};
use crate::database::role_adapter::{self, RoleAdapter, RoleError};
use crate::database::search::SearchResult;

pub struct RoleService {
    adapter: RoleAdapter,
    pool: PgPool,
    role: RoleConfig,
    search: SearchConfig,
}

impl RoleService {
    pub fn new(pool: PgPool, role: RoleConfig, search: SearchConfig) -> Self {
        Self { adapter: RoleAdapter::new(pool.clone(), role.clone()), pool, role, search }
    }

    pub async fn load(&self, role_id: &str) -> Result<Option<Role>, DatabaseError> {
        self.adapter.load(role_id).await
    }

    /// Creates the role, generating an id first when allowed and none was sent
    pub async fn create(&self, role: &mut Role) -> Result<i64, RoleError> {
        if role.role_id.is_empty() {
            if !self.role.auto_id {
                return Err(RoleError::MissingRoleId);
            }
            role.role_id = Uuid::new_v4().simple().to_string();
        }
        Ok(self.adapter.create(role).await?)
    }

    pub async fn update(&self, role: &Role) -> Result<i64, DatabaseError> {
        self.adapter.update(role).await
    }

    pub async fn patch(&self, payload: &Map<String, Value>) -> Result<i64, RoleError> {
        self.adapter.patch(payload).await
    }

    pub async fn delete(&self, role_id: &str) -> Result<i64, DatabaseError> {
        self.adapter.delete(role_id).await
    }

    pub async fn assign(&self, role_id: &str, users: &[String]) -> Result<i64, DatabaseError> {
        self.adapter.assign(role_id, users).await
    }

    pub async fn users(&self, role_id: &str) -> Result<Vec<String>, DatabaseError> {
        self.adapter.users(role_id).await
    }

    pub async fn search(&self, filter: &RoleFilter) -> Result<SearchResult<Role>, DatabaseError> {
        self.adapter.search(filter, &self.search).await
    }

    pub async fn codes(&self) -> Result<Vec<RoleCode>, DatabaseError> {
        self.adapter.codes().await
    }

    pub async fn catalog(&self) -> Result<Vec<Privilege>, DatabaseError> {
        role_adapter::module_catalog(&self.pool).await
    }

    pub async fn privileges_of(&self, user_id: &str) -> Result<Vec<Privilege>, DatabaseError> {
        role_adapter::privileges_of_user(&self.pool, user_id).await
    }
}
