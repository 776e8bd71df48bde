use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    ConnectOptions, PgPool,
};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid value for field '{field}': expected {expected}")]
    InvalidField { field: String, expected: &'static str },

    #[error("Missing key field: {0}")]
    MissingKey(String),

    #[error("No updatable field in payload")]
    EmptyPatch,

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// True when Postgres rejected a write because of a unique/primary key.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::Sqlx(sqlx::Error::Database(db)) => db.code().as_deref() == Some("23505"),
            _ => false,
        }
    }
}

/// Builds and checks the application connection pool
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open a pool against `DATABASE_URL`
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let options = Self::connect_options(config)?;
        let pool = Self::pool_options(config).connect_with(options).await?;
        info!(max_connections = config.max_connections, "Created database pool");
        Ok(pool)
    }

    /// Build a pool that only connects on first use
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let options = Self::connect_options(config)?;
        Ok(Self::pool_options(config).connect_lazy_with(options))
    }

    fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, DatabaseError> {
        let options: PgConnectOptions = Self::connection_string(config)?.parse()?;
        Ok(if config.enable_query_logging {
            options
        } else {
            options.disable_statement_logging()
        })
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
    }

    fn connection_string(config: &DatabaseConfig) -> Result<String, DatabaseError> {
        let raw = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        match url.scheme() {
            "postgres" | "postgresql" => Ok(url.into()),
            _ => Err(DatabaseError::InvalidDatabaseUrl),
        }
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>) -> DatabaseConfig {
        DatabaseConfig {
            url: url.map(str::to_string),
            max_connections: 2,
            connection_timeout: 1,
            enable_query_logging: false,
        }
    }

    #[test]
    fn requires_database_url() {
        let err = DatabaseManager::connection_string(&config(None)).unwrap_err();
        assert!(matches!(err, DatabaseError::ConfigMissing("DATABASE_URL")));
    }

    #[test]
    fn rejects_non_postgres_urls() {
        assert!(matches!(
            DatabaseManager::connection_string(&config(Some("mysql://localhost/db"))),
            Err(DatabaseError::InvalidDatabaseUrl)
        ));
        assert!(matches!(
            DatabaseManager::connection_string(&config(Some("not a url"))),
            Err(DatabaseError::InvalidDatabaseUrl)
        ));
        let ok = DatabaseManager::connection_string(&config(Some("postgres://u:p@localhost:5432/site"))).unwrap();
        assert!(ok.starts_with("postgres://u:p@localhost:5432/site"));
    }
}
