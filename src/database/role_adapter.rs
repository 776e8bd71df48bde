//! Roles together with their module grants and user assignments.
//!
//! Every write is a [`Statements`] batch so the role row and its
//! `role_modules`/`user_roles` rows change in one transaction. Associations
//! are replaced wholesale (delete, then re-insert) rather than diffed.

use serde_json::{Map, Value};
use sqlx::PgPool;
use thiserror::Error;

use crate::config::{RoleConfig, SearchConfig};
use crate::database::manager::DatabaseError;
use crate::database::models::privilege::{self, Privilege};
use crate::database::models::role::{
    modules_of, Role, RoleCode, RoleFilter, RoleModule, UserRole, ROLE_MODULE_SCHEMA, ROLE_SCHEMA,
    USER_ROLE_SCHEMA,
};
use crate::database::search::{self, SearchResult};
use crate::database::statements::{exists, Statement, Statements};

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("roleId must be in payload")]
    MissingRoleId,

    #[error("roleId must be a string")]
    RoleIdNotString,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

fn delete_modules(role_id: &str) -> Statement {
    Statement::new("delete from role_modules where role_id = $1", vec![role_id.into()])
}

fn insert_modules(modules: &[RoleModule]) -> Option<Statement> {
    ROLE_MODULE_SCHEMA.insert_batch(modules.iter().map(RoleModule::values).collect())
}

/// Role row, then its module rows
pub fn create_plan(role: &Role) -> Statements {
    let mut sts = Statements::new(true);
    sts.add(ROLE_SCHEMA.insert(role.values()));
    sts.add_opt(insert_modules(&role.modules()));
    sts
}

/// Role row, drop every module row, re-insert the submitted set
pub fn update_plan(role: &Role) -> Statements {
    let mut sts = Statements::new(true);
    sts.add(ROLE_SCHEMA.update(role.values()));
    sts.add(delete_modules(&role.role_id));
    sts.add_opt(insert_modules(&role.modules()));
    sts
}

/// Sparse update of a role.
///
/// `privileges` counts only when it is an array of strings; any other value
/// is treated as absent. Module rows are deleted whenever privileges were
/// supplied, and also on a privilege-less patch while `clears_modules` is on.
pub fn patch_plan(payload: &Map<String, Value>, clears_modules: bool) -> Result<Statements, RoleError> {
    let role_id = match payload.get("roleId") {
        None => return Err(RoleError::MissingRoleId),
        Some(Value::String(id)) => id.clone(),
        Some(_) => return Err(RoleError::RoleIdNotString),
    };
    let privileges = payload.get("privileges").and_then(privilege_tokens);

    let columns = ROLE_SCHEMA.patch(payload)?;
    let mut sts = Statements::new(columns.is_some());
    sts.add_opt(columns);

    if privileges.is_some() || clears_modules {
        sts.add(delete_modules(&role_id));
    }
    if let Some(privileges) = privileges {
        sts.add_opt(insert_modules(&modules_of(&role_id, &privileges)));
    }
    Ok(sts)
}

fn privilege_tokens(value: &Value) -> Option<Vec<Privilege>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(privilege::decode))
        .collect()
}

/// Module rows, then the role row
pub fn delete_plan(role_id: &str) -> Statements {
    let mut sts = Statements::new(false);
    sts.add(delete_modules(role_id));
    sts.add(Statement::new("delete from roles where role_id = $1", vec![role_id.into()]));
    sts
}

/// Replace every user assigned to the role
pub fn assign_plan(role_id: &str, users: &[String]) -> Statements {
    let rows = users
        .iter()
        .map(|u| UserRole { user_id: u.clone(), role_id: role_id.to_string() }.values())
        .collect();
    let mut sts = Statements::new(false);
    sts.add(Statement::new("delete from user_roles where role_id = $1", vec![role_id.into()]));
    sts.add_opt(USER_ROLE_SCHEMA.insert_batch(rows));
    sts
}

pub struct RoleAdapter {
    pool: PgPool,
    config: RoleConfig,
}

impl RoleAdapter {
    pub fn new(pool: PgPool, config: RoleConfig) -> Self {
        Self { pool, config }
    }

    /// The role with its privileges, or `None` when it does not exist
    pub async fn load(&self, role_id: &str) -> Result<Option<Role>, DatabaseError> {
        let role = sqlx::query_as::<_, Role>(&ROLE_SCHEMA.select_by_key())
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(mut role) = role else {
            return Ok(None);
        };
        let modules = sqlx::query_as::<_, RoleModule>(
            "select role_id, module_id, permissions from role_modules where role_id = $1 order by module_id",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        role.privileges = modules.iter().map(RoleModule::privilege).collect();
        Ok(Some(role))
    }

    pub async fn create(&self, role: &Role) -> Result<i64, DatabaseError> {
        create_plan(role).exec(&self.pool).await
    }

    pub async fn update(&self, role: &Role) -> Result<i64, DatabaseError> {
        update_plan(role).exec(&self.pool).await
    }

    pub async fn patch(&self, payload: &Map<String, Value>) -> Result<i64, RoleError> {
        let plan = patch_plan(payload, self.config.patch_clears_modules)?;
        Ok(plan.exec(&self.pool).await?)
    }

    /// `-1` while any user is still assigned to the role
    pub async fn delete(&self, role_id: &str) -> Result<i64, DatabaseError> {
        let in_use = exists(
            &self.pool,
            "select user_id from user_roles where role_id = $1 limit 1",
            &[role_id.into()],
        )
        .await?;
        if in_use {
            return Ok(-1);
        }
        delete_plan(role_id).exec(&self.pool).await
    }

    pub async fn assign(&self, role_id: &str, users: &[String]) -> Result<i64, DatabaseError> {
        assign_plan(role_id, users).exec(&self.pool).await
    }

    pub async fn search(
        &self,
        filter: &RoleFilter,
        config: &SearchConfig,
    ) -> Result<SearchResult<Role>, DatabaseError> {
        search::search(&self.pool, &ROLE_SCHEMA, filter, config).await
    }

    /// Active roles as a code list
    pub async fn codes(&self) -> Result<Vec<RoleCode>, DatabaseError> {
        let codes = sqlx::query_as::<_, RoleCode>(
            "select role_id as value, role_name as text from roles where status = 'A' order by role_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(codes)
    }

    /// Users currently assigned to the role
    pub async fn users(&self, role_id: &str) -> Result<Vec<String>, DatabaseError> {
        let users = sqlx::query_scalar::<_, String>(
            "select user_id from user_roles where role_id = $1 order by user_id",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}

/// Grants a user holds through active roles
pub async fn privileges_of_user(pool: &PgPool, user_id: &str) -> Result<Vec<Privilege>, DatabaseError> {
    let modules = sqlx::query_as::<_, RoleModule>(
        "select m.role_id, m.module_id, m.permissions from user_roles u \
         join roles r on u.role_id = r.role_id \
         join role_modules m on u.role_id = m.role_id \
         where u.user_id = $1 and r.status = 'A'",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(privilege::merge(modules.iter().map(RoleModule::privilege)))
}

/// Active modules of the catalog, each with the actions it supports
pub async fn module_catalog(pool: &PgPool) -> Result<Vec<Privilege>, DatabaseError> {
    let modules = sqlx::query_as::<_, (String, i32)>(
        "select module_id, actions from modules where status = 'A' order by sequence, module_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(modules.into_iter().map(|(module_id, actions)| Privilege::new(module_id, actions)).collect())
}

/// Masks a user holds on one module, one per granting role
pub async fn module_masks(pool: &PgPool, user_id: &str, module_id: &str) -> Result<Vec<i32>, DatabaseError> {
    let masks = sqlx::query_scalar::<_, i32>(
        "select m.permissions from user_roles u \
         join roles r on u.role_id = r.role_id \
         join role_modules m on u.role_id = m.role_id \
         where u.user_id = $1 and m.module_id = $2 and r.status = 'A'",
    )
    .bind(user_id)
    .bind(module_id)
    .fetch_all(pool)
    .await?;
    Ok(masks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::value::SqlValue;
    use serde_json::json;

    fn role(privileges: &[&str]) -> Role {
        Role {
            role_id: "r1".into(),
            role_name: "Editors".into(),
            status: "A".into(),
            privileges: privileges.iter().map(|p| privilege::decode(p)).collect(),
            ..Default::default()
        }
    }

    fn object(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn create_inserts_role_then_modules() {
        let plan = create_plan(&role(&["catalog", "orders 1A"]));
        assert!(plan.is_main());
        let items = plan.items();
        assert_eq!(items.len(), 2);
        assert!(items[0].sql.starts_with("insert into roles "));
        assert_eq!(
            items[1].sql,
            "insert into role_modules (role_id, module_id, permissions) values ($1, $2, $3), ($4, $5, $6)"
        );
        assert_eq!(
            items[1].args,
            vec![
                SqlValue::from("r1"),
                SqlValue::from("catalog"),
                SqlValue::from(0),
                SqlValue::from("r1"),
                SqlValue::from("orders"),
                SqlValue::from(26),
            ]
        );
    }

    #[test]
    fn create_without_privileges_is_one_statement() {
        assert_eq!(create_plan(&role(&[])).items().len(), 1);
    }

    #[test]
    fn update_replaces_modules() {
        let plan = update_plan(&role(&["a 3"]));
        let items = plan.items();
        assert_eq!(items.len(), 3);
        assert!(items[0].sql.starts_with("update roles set role_name = $1"));
        assert!(!items[0].sql.contains("created_by"));
        assert_eq!(items[1].sql, "delete from role_modules where role_id = $1");
        assert_eq!(items[2].args, vec![SqlValue::from("r1"), SqlValue::from("a"), SqlValue::from(3)]);
    }

    #[test]
    fn update_to_no_privileges_only_deletes() {
        let plan = update_plan(&role(&[]));
        assert_eq!(plan.items().len(), 2);
    }

    #[test]
    fn patch_requires_string_role_id() {
        assert!(matches!(
            patch_plan(&object(json!({"roleName": "x"})), true),
            Err(RoleError::MissingRoleId)
        ));
        assert!(matches!(
            patch_plan(&object(json!({"roleId": 5})), true),
            Err(RoleError::RoleIdNotString)
        ));
        assert_eq!(RoleError::MissingRoleId.to_string(), "roleId must be in payload");
        assert_eq!(RoleError::RoleIdNotString.to_string(), "roleId must be a string");
    }

    #[test]
    fn patch_without_privileges_still_clears_modules() {
        let plan = patch_plan(&object(json!({"roleId": "r1"})), true).unwrap();
        assert!(!plan.is_main());
        assert_eq!(plan.items().len(), 1);
        assert_eq!(plan.items()[0].sql, "delete from role_modules where role_id = $1");
        assert_eq!(plan.items()[0].args, vec![SqlValue::from("r1")]);
    }

    #[test]
    fn patch_keeps_modules_when_clearing_is_off() {
        let plan = patch_plan(&object(json!({"roleId": "r1", "roleName": "New"})), false).unwrap();
        assert!(plan.is_main());
        assert_eq!(plan.items().len(), 1);
        assert_eq!(plan.items()[0].sql, "update roles set role_name = $1 where role_id = $2");

        let empty = patch_plan(&object(json!({"roleId": "r1"})), false).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn patch_with_scalars_and_privileges() {
        let plan = patch_plan(
            &object(json!({"roleId": "r1", "status": "I", "privileges": ["job 3", "article"]})),
            true,
        )
        .unwrap();
        assert!(plan.is_main());
        let items = plan.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].sql, "update roles set status = $1 where role_id = $2");
        assert_eq!(items[1].sql, "delete from role_modules where role_id = $1");
        assert_eq!(items[2].args.len(), 6);
        assert_eq!(items[2].args[2], SqlValue::from(3));
    }

    #[test]
    fn patch_ignores_privileges_that_are_not_strings() {
        let plan = patch_plan(&object(json!({"roleId": "r1", "privileges": [1, 2]})), false).unwrap();
        assert!(plan.is_empty());
        let plan = patch_plan(&object(json!({"roleId": "r1", "privileges": "job 3"})), true).unwrap();
        assert_eq!(plan.items().len(), 1);
    }

    #[test]
    fn patch_with_empty_privilege_list_clears_only() {
        let plan = patch_plan(&object(json!({"roleId": "r1", "privileges": []})), false).unwrap();
        assert_eq!(plan.items().len(), 1);
        assert_eq!(plan.items()[0].sql, "delete from role_modules where role_id = $1");
    }

    #[test]
    fn delete_removes_modules_before_role() {
        let plan = delete_plan("r1");
        assert!(!plan.is_main());
        assert_eq!(plan.items()[0].sql, "delete from role_modules where role_id = $1");
        assert_eq!(plan.items()[1].sql, "delete from roles where role_id = $1");
    }

    #[test]
    fn assign_replaces_users() {
        let plan = assign_plan("r1", &["u1".to_string(), "u2".to_string()]);
        let items = plan.items();
        assert_eq!(items[0].sql, "delete from user_roles where role_id = $1");
        assert_eq!(items[1].sql, "insert into user_roles (user_id, role_id) values ($1, $2), ($3, $4)");
        assert_eq!(items[1].args[2], SqlValue::from("u2"));

        let cleared = assign_plan("r1", &[]);
        assert_eq!(cleared.items().len(), 1);
    }
}
