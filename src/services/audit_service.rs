use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::audit_log::{AuditLog, AuditLogFilter, AUDIT_LOG_SCHEMA, STATUS_FAIL, STATUS_SUCCESS};
use crate::database::search::{self, SearchResult};
use crate::database::statements::Statements;

/// Who did what, from where
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub user_id: Option<String>,
    pub ip: Option<String>,
}

/// Records the outcome of write operations. Recording never fails the
/// request; a write error is only logged.
#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
    enabled: bool,
}

impl AuditService {
    pub fn new(pool: PgPool, enabled: bool) -> Self {
        Self { pool, enabled }
    }

    pub async fn write(
        &self,
        ctx: &AuditContext,
        resource: &str,
        action: &str,
        success: bool,
        remark: impl Into<String>,
    ) {
        if !self.enabled {
            return;
        }
        let entry = AuditLog {
            id: Uuid::new_v4().simple().to_string(),
            resource: resource.to_string(),
            user_id: ctx.user_id.clone(),
            ip: ctx.ip.clone(),
            action: action.to_string(),
            time: Utc::now(),
            status: if success { STATUS_SUCCESS } else { STATUS_FAIL }.to_string(),
            remark: Some(remark.into()),
        };
        let mut sts = Statements::new(true);
        sts.add(AUDIT_LOG_SCHEMA.insert(entry.values()));
        if let Err(e) = sts.exec(&self.pool).await {
            tracing::warn!(error = %e, resource, action, "failed to write audit log");
        }
    }

    pub async fn search(
        &self,
        filter: &AuditLogFilter,
        config: &SearchConfig,
    ) -> Result<SearchResult<AuditLog>, DatabaseError> {
        search::search(&self.pool, &AUDIT_LOG_SCHEMA, filter, config).await
    }
}
