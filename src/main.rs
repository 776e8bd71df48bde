use anyhow::Context;
use clap::Parser;
use sqlx::Executor;
use tracing_subscriber::EnvFilter;

use content_admin_api::app::{build_router, AppState};
use content_admin_api::config;
use content_admin_api::database::DatabaseManager;

const SCHEMA_SQL: &str = include_str!("../sql/schema.sql");

#[derive(Parser, Debug)]
#[command(name = "content-admin-api", version, about = "Content, recruitment and RBAC administration API")]
struct Args {
    /// Port to listen on, overriding API_PORT / PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Create missing tables before serving
    #[arg(long, env = "INIT_SCHEMA")]
    init_schema: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = config::config().clone();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    tracing::info!("Starting content admin API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() && !config.security.skip {
        anyhow::bail!("JWT_SECRET must be set unless SECURITY_SKIP=true");
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;

    if args.init_schema {
        pool.execute(SCHEMA_SQL).await.context("failed to apply sql/schema.sql")?;
        tracing::info!("Database schema is in place");
    }

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let app = build_router(AppState::new(pool, config));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
