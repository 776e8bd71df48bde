use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::privilege::Privilege;
use crate::database::schema::{Column, ColumnKind, TableSchema};
use crate::database::search::{lenient, Paging, SearchFilter, WhereBuilder};
use crate::database::value::SqlValue;

pub static ROLE_SCHEMA: TableSchema = TableSchema {
    table: "roles",
    columns: &[
        Column::new("role_id", "roleId", ColumnKind::Text).key(),
        Column::new("role_name", "roleName", ColumnKind::Text),
        Column::new("status", "status", ColumnKind::Text),
        Column::new("remark", "remark", ColumnKind::Text),
        Column::new("created_by", "createdBy", ColumnKind::Text).insert_only(),
        Column::new("created_at", "createdAt", ColumnKind::Timestamp).insert_only(),
        Column::new("updated_by", "updatedBy", ColumnKind::Text),
        Column::new("updated_at", "updatedAt", ColumnKind::Timestamp),
    ],
};

pub static ROLE_MODULE_SCHEMA: TableSchema = TableSchema {
    table: "role_modules",
    columns: &[
        Column::new("role_id", "roleId", ColumnKind::Text).key(),
        Column::new("module_id", "moduleId", ColumnKind::Text).key(),
        Column::new("permissions", "permissions", ColumnKind::Int4),
    ],
};

pub static USER_ROLE_SCHEMA: TableSchema = TableSchema {
    table: "user_roles",
    columns: &[
        Column::new("user_id", "userId", ColumnKind::Text).key(),
        Column::new("role_id", "roleId", ColumnKind::Text).key(),
    ],
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(default)]
    #[validate(length(max = 40))]
    pub role_id: String,
    #[validate(length(min = 1, max = 255, message = "roleName is required and at most 255 characters"))]
    pub role_name: String,
    #[validate(length(equal = 1, message = "status must be a single character code"))]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Derived from the role's `role_modules` rows
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub privileges: Vec<Privilege>,
}

impl Role {
    pub fn values(&self) -> Vec<SqlValue> {
        vec![
            self.role_id.clone().into(),
            self.role_name.clone().into(),
            self.status.clone().into(),
            self.remark.clone().into(),
            self.created_by.clone().into(),
            self.created_at.into(),
            self.updated_by.clone().into(),
            self.updated_at.into(),
        ]
    }

    /// One `role_modules` row per privilege, bound to this role
    pub fn modules(&self) -> Vec<RoleModule> {
        modules_of(&self.role_id, &self.privileges)
    }
}

pub fn modules_of(role_id: &str, privileges: &[Privilege]) -> Vec<RoleModule> {
    privileges
        .iter()
        .map(|p| RoleModule {
            role_id: role_id.to_string(),
            module_id: p.module_id.clone(),
            permissions: p.permissions,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoleModule {
    pub role_id: String,
    pub module_id: String,
    pub permissions: i32,
}

impl RoleModule {
    pub fn values(&self) -> Vec<SqlValue> {
        vec![self.role_id.clone().into(), self.module_id.clone().into(), self.permissions.into()]
    }

    pub fn privilege(&self) -> Privilege {
        Privilege::new(self.module_id.clone(), self.permissions)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    pub user_id: String,
    pub role_id: String,
}

impl UserRole {
    pub fn values(&self) -> Vec<SqlValue> {
        vec![self.user_id.clone().into(), self.role_id.clone().into()]
    }
}

/// Entry of the active-roles code list
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RoleCode {
    pub value: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleFilter {
    #[serde(flatten)]
    pub paging: Paging,
    pub role_id: Option<String>,
    pub role_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_list")]
    pub status: Option<Vec<String>>,
}

impl SearchFilter for RoleFilter {
    fn paging(&self) -> &Paging {
        &self.paging
    }

    fn to_where(&self) -> (String, Vec<SqlValue>) {
        let mut w = WhereBuilder::new();
        w.eq("role_id", self.role_id.as_deref())
            .prefix("role_name", self.role_name.as_deref(), true)
            .any("status", self.status.as_deref());
        w.build()
    }

    fn default_sort(&self) -> Option<&'static str> {
        Some("roleName")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn privileges_travel_as_tokens() {
        let role: Role = serde_json::from_value(json!({
            "roleId": "admin",
            "roleName": "Administrator",
            "status": "A",
            "privileges": ["catalog", "orders 1A"]
        }))
        .unwrap();
        assert_eq!(
            role.modules(),
            vec![
                RoleModule { role_id: "admin".into(), module_id: "catalog".into(), permissions: 0 },
                RoleModule { role_id: "admin".into(), module_id: "orders".into(), permissions: 26 },
            ]
        );
        let out = serde_json::to_value(&role).unwrap();
        assert_eq!(out["privileges"], json!(["catalog", "orders 1A"]));
        assert!(out.get("createdAt").is_none());
    }

    #[test]
    fn validates_required_fields() {
        let role = Role { role_id: "r1".into(), role_name: String::new(), status: "AB".into(), ..Default::default() };
        let errors = role.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("role_name"));
        assert!(fields.contains_key("status"));
    }

    #[test]
    fn values_follow_schema_order() {
        let role = Role { role_id: "r1".into(), role_name: "R".into(), status: "A".into(), ..Default::default() };
        let values = role.values();
        assert_eq!(values.len(), ROLE_SCHEMA.columns.len());
        assert_eq!(values[0], SqlValue::from("r1"));
        assert_eq!(values[5], SqlValue::Timestamp(None));
    }

    #[test]
    fn filter_builds_where() {
        let filter: RoleFilter = serde_json::from_value(json!({"roleName": "adm", "status": ["A"]})).unwrap();
        let (sql, params) = filter.to_where();
        assert_eq!(sql, " where role_name ilike $1 and status = any($2)");
        assert_eq!(params.len(), 2);
    }
}
