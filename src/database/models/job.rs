use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::database::entity::Entity;
use crate::database::schema::{Column, ColumnKind, TableSchema};
use crate::database::search::{lenient, Paging, SearchFilter, TimeRange, WhereBuilder};
use crate::database::value::SqlValue;

pub static JOB_SCHEMA: TableSchema = TableSchema {
    table: "jobs",
    columns: &[
        Column::new("id", "id", ColumnKind::Text).key(),
        Column::new("title", "title", ColumnKind::Text),
        Column::new("description", "description", ColumnKind::Text),
        Column::new("published_at", "publishedAt", ColumnKind::Timestamp),
        Column::new("expired_at", "expiredAt", ColumnKind::Timestamp),
        Column::new("position", "position", ColumnKind::Text),
        Column::new("quantity", "quantity", ColumnKind::Int4),
        Column::new("location", "location", ColumnKind::Text),
        Column::new("applicant_count", "applicantCount", ColumnKind::Int4),
        Column::new("skills", "skills", ColumnKind::TextArray),
        Column::new("min_salary", "minSalary", ColumnKind::Int8),
        Column::new("max_salary", "maxSalary", ColumnKind::Int8),
        Column::new("company_id", "companyId", ColumnKind::Text),
    ],
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_salary_range"))]
pub struct Job {
    #[validate(length(min = 1, max = 40))]
    pub id: String,
    #[validate(length(max = 120))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    #[validate(length(max = 100))]
    pub position: Option<String>,
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub applicant_count: Option<i32>,
    pub skills: Option<Vec<String>>,
    pub min_salary: Option<i64>,
    pub max_salary: Option<i64>,
    pub company_id: Option<String>,
}

fn validate_salary_range(job: &Job) -> Result<(), validator::ValidationError> {
    match (job.min_salary, job.max_salary) {
        (Some(min), Some(max)) if min > max => {
            let mut err = validator::ValidationError::new("salary_range");
            err.message = Some("minSalary must not exceed maxSalary".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

impl Entity for Job {
    type Filter = JobFilter;
    const MODULE: &'static str = "job";

    fn schema() -> &'static TableSchema {
        &JOB_SCHEMA
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.title.clone().into(),
            self.description.clone().into(),
            self.published_at.into(),
            self.expired_at.into(),
            self.position.clone().into(),
            self.quantity.into(),
            self.location.clone().into(),
            self.applicant_count.into(),
            self.skills.clone().into(),
            self.min_salary.into(),
            self.max_salary.into(),
            self.company_id.clone().into(),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    #[serde(flatten)]
    pub paging: Paging,
    pub id: Option<String>,
    pub company_id: Option<String>,
    pub title: Option<String>,
    pub published_at: Option<TimeRange>,
    pub expired_at: Option<TimeRange>,
    pub position: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_list")]
    pub skills: Option<Vec<String>>,
}

impl SearchFilter for JobFilter {
    fn paging(&self) -> &Paging {
        &self.paging
    }

    fn to_where(&self) -> (String, Vec<SqlValue>) {
        let mut w = WhereBuilder::new();
        w.eq("id", self.id.as_deref())
            .eq("company_id", self.company_id.as_deref())
            .prefix("title", self.title.as_deref(), false)
            .time_range("published_at", self.published_at.as_ref())
            .time_range("expired_at", self.expired_at.as_ref())
            .prefix("position", self.position.as_deref(), false)
            .prefix("location", self.location.as_deref(), false)
            .overlaps("skills", self.skills.as_deref());
        w.build()
    }

    fn default_sort(&self) -> Option<&'static str> {
        Some("-publishedAt")
    }
}
