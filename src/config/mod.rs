use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub search: SearchConfig,
    pub security: SecurityConfig,
    pub audit_log: AuditLogConfig,
    pub role: RoleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_limit: i64,
    pub max_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Disables authentication and module authorization entirely.
    pub skip: bool,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Generate a role id when a created role arrives without one.
    pub auto_id: bool,
    /// A scalar-only PATCH of a role also removes its role_modules rows.
    /// Existing clients depend on this, so it stays on until they are migrated.
    pub patch_clears_modules: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }
        if let Ok(v) = env::var("SERVER_CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // Search overrides
        if let Ok(v) = env::var("SEARCH_DEFAULT_LIMIT") {
            self.search.default_limit = v.parse().unwrap_or(self.search.default_limit);
        }
        if let Ok(v) = env::var("SEARCH_MAX_LIMIT") {
            self.search.max_limit = v.parse().unwrap_or(self.search.max_limit);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_SKIP") {
            self.security.skip = v.parse().unwrap_or(self.security.skip);
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        // Audit log overrides
        if let Ok(v) = env::var("AUDIT_LOG_ENABLED") {
            self.audit_log.enabled = v.parse().unwrap_or(self.audit_log.enabled);
        }

        // Role overrides
        if let Ok(v) = env::var("ROLE_AUTO_ID") {
            self.role.auto_id = v.parse().unwrap_or(self.role.auto_id);
        }
        if let Ok(v) = env::var("ROLE_PATCH_CLEARS_MODULES") {
            self.role.patch_clears_modules = v.parse().unwrap_or(self.role.patch_clears_modules);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 8080,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:4200".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            search: SearchConfig {
                default_limit: 20,
                max_limit: 1000,
            },
            security: SecurityConfig {
                skip: false,
                jwt_secret: "development-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            audit_log: AuditLogConfig { enabled: false },
            role: RoleConfig {
                auto_id: true,
                patch_clears_modules: true,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 8080,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            search: SearchConfig {
                default_limit: 20,
                max_limit: 500,
            },
            security: SecurityConfig {
                skip: false,
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
            audit_log: AuditLogConfig { enabled: true },
            role: RoleConfig {
                auto_id: true,
                patch_clears_modules: true,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 8080,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            search: SearchConfig {
                default_limit: 20,
                max_limit: 100,
            },
            security: SecurityConfig {
                skip: false,
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
            },
            audit_log: AuditLogConfig { enabled: true },
            role: RoleConfig {
                auto_id: false,
                patch_clears_modules: true,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.security.skip);
        assert_eq!(config.search.max_limit, 1000);
        assert!(config.role.auto_id);
        assert!(config.role.patch_clears_modules);
        assert!(!config.audit_log.enabled);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.search.max_limit, 100);
        assert!(config.audit_log.enabled);
        assert!(config.security.jwt_secret.is_empty());
        assert!(!config.role.auto_id);
    }
}
