use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::database::entity::Entity;
use crate::database::schema::{Column, ColumnKind, TableSchema};
use crate::database::search::{Paging, SearchFilter, TimeRange, WhereBuilder};
use crate::database::value::SqlValue;

pub static CONTACT_SCHEMA: TableSchema = TableSchema {
    table: "contacts",
    columns: &[
        Column::new("id", "id", ColumnKind::Text).key(),
        Column::new("name", "name", ColumnKind::Text),
        Column::new("country", "country", ColumnKind::Text),
        Column::new("company", "company", ColumnKind::Text),
        Column::new("job_title", "jobTitle", ColumnKind::Text),
        Column::new("email", "email", ColumnKind::Text),
        Column::new("phone", "phone", ColumnKind::Text),
        Column::new("message", "message", ColumnKind::Text),
        Column::new("submitted_at", "submittedAt", ColumnKind::Timestamp).insert_only(),
        Column::new("contacted_at", "contactedAt", ColumnKind::Timestamp),
        Column::new("contacted_by", "contactedBy", ColumnKind::Text),
    ],
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[validate(length(min = 1, max = 40))]
    pub id: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[validate(length(min = 1, max = 100))]
    pub company: String,
    #[validate(length(min = 1, max = 100))]
    pub job_title: String,
    #[validate(email, length(max = 120))]
    pub email: String,
    #[validate(length(min = 1, max = 18))]
    pub phone: String,
    #[validate(length(min = 1, max = 400))]
    pub message: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub contacted_by: Option<String>,
}

impl Entity for Contact {
    type Filter = ContactFilter;
    const MODULE: &'static str = "contact";

    fn schema() -> &'static TableSchema {
        &CONTACT_SCHEMA
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.name.clone().into(),
            self.country.clone().into(),
            self.company.clone().into(),
            self.job_title.clone().into(),
            self.email.clone().into(),
            self.phone.clone().into(),
            self.message.clone().into(),
            self.submitted_at.or_else(|| Some(Utc::now())).into(),
            self.contacted_at.into(),
            self.contacted_by.clone().into(),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFilter {
    #[serde(flatten)]
    pub paging: Paging,
    pub id: Option<String>,
    pub name: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub submitted_at: Option<TimeRange>,
}

impl SearchFilter for ContactFilter {
    fn paging(&self) -> &Paging {
        &self.paging
    }

    fn to_where(&self) -> (String, Vec<SqlValue>) {
        let mut w = WhereBuilder::new();
        w.eq("id", self.id.as_deref())
            .time_range("submitted_at", self.submitted_at.as_ref())
            .prefix("email", self.email.as_deref(), true)
            .prefix("phone", self.phone.as_deref(), true)
            .prefix("country", self.country.as_deref(), true)
            .contains("name", self.name.as_deref());
        w.build()
    }

    fn default_sort(&self) -> Option<&'static str> {
        Some("-submittedAt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contact(email: &str) -> Contact {
        serde_json::from_value(json!({
            "id": "c1",
            "name": "Lan",
            "country": "VN",
            "company": "Acme",
            "jobTitle": "CTO",
            "email": email,
            "phone": "+84123456",
            "message": "Hello"
        }))
        .unwrap()
    }

    #[test]
    fn validates_email() {
        assert!(contact("lan@example.com").validate().is_ok());
        assert!(contact("not-an-email").validate().is_err());
    }

    #[test]
    fn stamps_submission_time() {
        let values = contact("lan@example.com").values();
        assert!(matches!(values[8], SqlValue::Timestamp(Some(_))));
    }

    #[test]
    fn name_filter_targets_name_column() {
        let filter: ContactFilter = serde_json::from_value(json!({"name": "la", "email": "lan@"})).unwrap();
        let (sql, _) = filter.to_where();
        assert_eq!(sql, " where email ilike $1 and name ilike $2");
    }
}
