//! Role persistence against a real PostgreSQL. Skipped unless DATABASE_URL is set.

mod common;

use anyhow::Result;
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use std::time::Duration;

use content_admin_api::config::RoleConfig;
use content_admin_api::database::models::privilege::{self, Privilege};
use content_admin_api::database::models::Role;
use content_admin_api::database::role_adapter::{self, RoleAdapter};

macro_rules! require_database {
    () => {
        match common::database().await {
            Some(pool) => pool,
            None => {
                eprintln!("DATABASE_URL not set; skipping");
                return Ok(());
            }
        }
    };
}

fn adapter(pool: &PgPool, patch_clears_modules: bool) -> RoleAdapter {
    RoleAdapter::new(pool.clone(), RoleConfig { auto_id: true, patch_clears_modules })
}

fn role(role_id: &str, privileges: &[&str]) -> Role {
    Role {
        role_id: role_id.to_string(),
        role_name: format!("Role {}", role_id),
        status: "A".to_string(),
        privileges: privileges.iter().map(|t| privilege::decode(t)).collect(),
        ..Default::default()
    }
}

fn payload(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

async fn module_rows(pool: &PgPool, role_id: &str) -> Result<Vec<(String, i32)>> {
    Ok(sqlx::query_as("select module_id, permissions from role_modules where role_id = $1 order by module_id")
        .bind(role_id)
        .fetch_all(pool)
        .await?)
}

#[tokio::test]
async fn loading_a_missing_role_is_not_an_error() -> Result<()> {
    let pool = require_database!();
    assert!(adapter(&pool, true).load(&common::unique("missing")).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn create_writes_one_module_row_per_privilege() -> Result<()> {
    let pool = require_database!();
    let roles = adapter(&pool, true);
    let id = common::unique("role");

    assert_eq!(roles.create(&role(&id, &["catalog", "orders 1A"])).await?, 1);
    assert_eq!(module_rows(&pool, &id).await?, vec![("catalog".to_string(), 0), ("orders".to_string(), 26)]);

    let loaded = roles.load(&id).await?.expect("role was created");
    assert_eq!(loaded.privileges, vec![Privilege::new("catalog", 0), Privilege::new("orders", 26)]);
    let tokens: Vec<String> = loaded.privileges.iter().map(Privilege::encode).collect();
    assert_eq!(tokens, vec!["catalog", "orders 1A"]);
    Ok(())
}

#[tokio::test]
async fn create_is_all_or_nothing() -> Result<()> {
    let pool = require_database!();
    let roles = adapter(&pool, true);
    let id = common::unique("role");

    // The same module twice breaks the role_modules primary key after the role row went in.
    assert!(roles.create(&role(&id, &["a 1", "a 2"])).await.is_err());
    assert!(roles.load(&id).await?.is_none());
    assert!(module_rows(&pool, &id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn update_replaces_the_privilege_set() -> Result<()> {
    let pool = require_database!();
    let roles = adapter(&pool, true);
    let id = common::unique("role");

    roles.create(&role(&id, &["a 1", "b 2"])).await?;
    let mut changed = role(&id, &["a 3"]);
    changed.role_name = "Renamed".to_string();
    assert_eq!(roles.update(&changed).await?, 1);

    assert_eq!(module_rows(&pool, &id).await?, vec![("a".to_string(), 3)]);
    assert_eq!(roles.load(&id).await.map(|r| r.map(|r| r.role_name))?, Some("Renamed".to_string()));

    assert_eq!(roles.update(&role(&common::unique("missing"), &[])).await?, 0);
    Ok(())
}

#[tokio::test]
async fn delete_is_blocked_while_users_hold_the_role() -> Result<()> {
    let pool = require_database!();
    let roles = adapter(&pool, true);
    let id = common::unique("role");

    roles.create(&role(&id, &["a 1"])).await?;
    roles.assign(&id, &["u1".to_string()]).await?;

    assert_eq!(roles.delete(&id).await?, -1);
    assert!(roles.load(&id).await?.is_some());
    assert_eq!(module_rows(&pool, &id).await?.len(), 1);

    roles.assign(&id, &[]).await?;
    // One module row plus the role row
    assert_eq!(roles.delete(&id).await?, 2);
    assert!(roles.load(&id).await?.is_none());
    assert!(module_rows(&pool, &id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn assign_replaces_the_user_set() -> Result<()> {
    let pool = require_database!();
    let roles = adapter(&pool, true);
    let id = common::unique("role");
    roles.create(&role(&id, &[])).await?;

    let users = vec!["u1".to_string(), "u2".to_string()];
    assert_eq!(roles.assign(&id, &users).await?, 2);
    assert_eq!(roles.users(&id).await?, users);

    assert_eq!(roles.assign(&id, &["u3".to_string()]).await?, 3);
    assert_eq!(roles.users(&id).await?, vec!["u3".to_string()]);

    roles.assign(&id, &[]).await?;
    assert!(roles.users(&id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn patch_with_only_the_key_still_clears_modules() -> Result<()> {
    let pool = require_database!();
    let roles = adapter(&pool, true);
    let id = common::unique("role");
    roles.create(&role(&id, &["a 1", "b 2"])).await?;

    let affected = roles.patch(&payload(json!({ "roleId": id }))).await?;
    assert_eq!(affected, 2);
    assert!(module_rows(&pool, &id).await?.is_empty());
    assert!(roles.load(&id).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn patch_leaves_modules_alone_when_clearing_is_off() -> Result<()> {
    let pool = require_database!();
    let roles = adapter(&pool, false);
    let id = common::unique("role");
    roles.create(&role(&id, &["a 1"])).await?;

    assert_eq!(roles.patch(&payload(json!({ "roleId": id, "remark": "kept" }))).await?, 1);
    assert_eq!(module_rows(&pool, &id).await?, vec![("a".to_string(), 1)]);
    Ok(())
}

#[tokio::test]
async fn patch_with_privileges_replaces_them() -> Result<()> {
    let pool = require_database!();
    let roles = adapter(&pool, true);
    let id = common::unique("role");
    roles.create(&role(&id, &["a 1", "b 2"])).await?;

    let patch = payload(json!({ "roleId": id, "roleName": "Patched", "privileges": ["c 7"] }));
    assert_eq!(roles.patch(&patch).await?, 1);

    let loaded = roles.load(&id).await?.expect("role still exists");
    assert_eq!(loaded.role_name, "Patched");
    assert_eq!(loaded.privileges, vec![Privilege::new("c", 7)]);

    // A scalar patch of a role that does not exist changes nothing.
    let missing = payload(json!({ "roleId": common::unique("missing"), "remark": "x", "privileges": ["c 1"] }));
    assert_eq!(roles.patch(&missing).await?, 0);
    Ok(())
}

#[tokio::test]
async fn user_privileges_merge_across_active_roles() -> Result<()> {
    let pool = require_database!();
    let roles = adapter(&pool, true);
    let user = common::unique("user");
    let (r1, r2, r3) = (common::unique("role"), common::unique("role"), common::unique("role"));

    roles.create(&role(&r1, &["article 1"])).await?;
    roles.create(&role(&r2, &["article 2", "job 1"])).await?;
    let mut inactive = role(&r3, &["contact 7"]);
    inactive.status = "D".to_string();
    roles.create(&inactive).await?;
    for r in [&r1, &r2, &r3] {
        roles.assign(r, &[user.clone()]).await?;
    }

    let mut merged = role_adapter::privileges_of_user(&pool, &user).await?;
    merged.sort_by(|a, b| a.module_id.cmp(&b.module_id));
    assert_eq!(merged, vec![Privilege::new("article", 3), Privilege::new("job", 1)]);

    let masks = role_adapter::module_masks(&pool, &user, "article").await?;
    assert!(privilege::allows(&masks, privilege::ACTION_WRITE));
    assert!(role_adapter::module_masks(&pool, &user, "contact").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn dropping_a_batch_midway_leaves_no_partial_write() -> Result<()> {
    let pool = require_database!();
    let roles = adapter(&pool, true);
    let id = common::unique("role");
    roles.create(&role(&id, &["a 1", "b 2"])).await?;

    let before = vec![("a".to_string(), 1), ("b".to_string(), 2)];
    let after = vec![("c".to_string(), 3), ("d".to_string(), 4)];
    let mut changed = role(&id, &["c 3", "d 4"]);
    changed.role_name = "Changed".to_string();

    // Later deadlines may let the batch finish; either way it is all or nothing.
    let mut cancelled = 0;
    for wait in [0, 1, 2, 5] {
        let plan = role_adapter::update_plan(&changed);
        let outcome = tokio::time::timeout(Duration::from_millis(wait), plan.exec(&pool)).await;
        let rows = module_rows(&pool, &id).await?;
        let name = roles.load(&id).await?.map(|r| r.role_name);
        match outcome {
            Err(_) => {
                cancelled += 1;
                assert!(rows == before || rows == after, "partial module rows {:?}", rows);
                let expected = if rows == before { format!("Role {}", id) } else { "Changed".to_string() };
                assert_eq!(name, Some(expected));
            }
            Ok(result) => {
                assert_eq!(result?, 1);
                assert_eq!(rows, after);
                assert_eq!(name.as_deref(), Some("Changed"));
            }
        }
    }
    // A zero deadline never lets a network round trip finish
    assert!(cancelled >= 1);
    Ok(())
}
