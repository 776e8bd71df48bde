use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::schema::{Column, ColumnKind, TableSchema};
use crate::database::search::{Paging, SearchFilter, TimeRange, WhereBuilder};
use crate::database::value::SqlValue;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAIL: &str = "fail";

pub static AUDIT_LOG_SCHEMA: TableSchema = TableSchema {
    table: "audit_logs",
    columns: &[
        Column::new("id", "id", ColumnKind::Text).key(),
        Column::new("resource", "resource", ColumnKind::Text),
        Column::new("user_id", "userId", ColumnKind::Text),
        Column::new("ip", "ip", ColumnKind::Text),
        Column::new("action", "action", ColumnKind::Text),
        Column::new("time", "time", ColumnKind::Timestamp),
        Column::new("status", "status", ColumnKind::Text),
        Column::new("remark", "remark", ColumnKind::Text),
    ],
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: String,
    pub resource: String,
    pub user_id: Option<String>,
    pub ip: Option<String>,
    pub action: String,
    pub time: DateTime<Utc>,
    pub status: String,
    pub remark: Option<String>,
}

impl AuditLog {
    pub fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.resource.clone().into(),
            self.user_id.clone().into(),
            self.ip.clone().into(),
            self.action.clone().into(),
            self.time.into(),
            self.status.clone().into(),
            self.remark.clone().into(),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogFilter {
    #[serde(flatten)]
    pub paging: Paging,
    pub user_id: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
    pub time: Option<TimeRange>,
}

impl SearchFilter for AuditLogFilter {
    fn paging(&self) -> &Paging {
        &self.paging
    }

    fn to_where(&self) -> (String, Vec<SqlValue>) {
        let mut w = WhereBuilder::new();
        w.eq("user_id", self.user_id.as_deref())
            .eq("resource", self.resource.as_deref())
            .eq("action", self.action.as_deref())
            .time_range("time", self.time.as_ref());
        w.build()
    }

    fn default_sort(&self) -> Option<&'static str> {
        Some("-time")
    }
}
