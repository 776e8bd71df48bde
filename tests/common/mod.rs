#![allow(dead_code)]

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use sqlx::{Executor, PgPool};

use content_admin_api::app::{build_router, AppState};
use content_admin_api::auth::{generate_jwt, Claims};
use content_admin_api::config::AppConfig;
use content_admin_api::database::DatabaseManager;

pub const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Nothing listens here, so every query fails fast
const UNREACHABLE_DATABASE: &str = "postgres://nobody@127.0.0.1:1/none";

pub struct TestServer {
    pub base_url: String,
    pub config: AppConfig,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Bearer token for `user_id`, signed with this server's secret
    pub fn token(&self, user_id: &str) -> String {
        let claims = Claims::new(user_id, user_id, 1);
        generate_jwt(&claims, &self.config.security).expect("sign test token")
    }
}

pub fn test_config(skip_security: bool) -> AppConfig {
    let mut config = AppConfig::development();
    config.database.url = Some(std::env::var("DATABASE_URL").unwrap_or_else(|_| UNREACHABLE_DATABASE.to_string()));
    config.database.max_connections = 2;
    config.database.connection_timeout = 1;
    config.security.skip = skip_security;
    config.security.jwt_secret = "integration-test-secret".to_string();
    config
}

/// A server whose pool points at a database that does not exist
pub async fn spawn_offline(skip_security: bool) -> Result<TestServer> {
    let mut config = test_config(skip_security);
    config.database.url = Some(UNREACHABLE_DATABASE.to_string());
    let pool = DatabaseManager::connect_lazy(&config.database)?;
    spawn(config, pool).await
}

/// Serves the router on a free local port inside the current test runtime
pub async fn spawn(config: AppConfig, pool: PgPool) -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;
    let app = build_router(AppState::new(pool, config.clone()));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let server = TestServer { base_url: format!("http://127.0.0.1:{}", port), config };
    wait_ready(&server, Duration::from_secs(10)).await?;
    Ok(server)
}

async fn wait_ready(server: &TestServer, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::new();
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if let Ok(resp) = client.get(server.url("/health")).send().await {
            // Either answer proves the listener is up
            if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    anyhow::bail!("server did not become ready on {} within {:?}", server.base_url, timeout)
}

/// Pool on `DATABASE_URL` with the schema applied, or `None` when the
/// variable is unset and database tests should be skipped.
pub async fn database() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let mut config = test_config(false);
    config.database.url = Some(url);
    let pool = DatabaseManager::connect(&config.database).await.expect("connect to DATABASE_URL");
    // Test binaries run in parallel; serialise the DDL on one session.
    let ddl = format!("select pg_advisory_lock(7311);\n{}\nselect pg_advisory_unlock(7311);", SCHEMA_SQL);
    pool.execute(ddl.as_str()).await.expect("apply schema");
    Some(pool)
}

/// Unique id so parallel tests never share rows
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}
