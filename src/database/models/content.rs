use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::database::entity::Entity;
use crate::database::schema::{Column, ColumnKind, TableSchema};
use crate::database::search::{lenient, Paging, SearchFilter, TimeRange, WhereBuilder};
use crate::database::value::SqlValue;

/// Localised pages, keyed by id and language
pub static CONTENT_SCHEMA: TableSchema = TableSchema {
    table: "contents",
    columns: &[
        Column::new("id", "id", ColumnKind::Text).key(),
        Column::new("lang", "lang", ColumnKind::Text).key(),
        Column::new("title", "title", ColumnKind::Text),
        Column::new("body", "body", ColumnKind::Text),
        Column::new("published_at", "publishedAt", ColumnKind::Timestamp),
        Column::new("tags", "tags", ColumnKind::TextArray),
        Column::new("status", "status", ColumnKind::Text),
    ],
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[validate(length(min = 1, max = 40))]
    pub id: String,
    #[validate(length(min = 2, max = 10))]
    pub lang: String,
    #[validate(length(max = 255))]
    pub title: Option<String>,
    pub body: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    #[validate(length(equal = 1))]
    pub status: Option<String>,
}

impl Entity for Content {
    type Filter = ContentFilter;
    const MODULE: &'static str = "content";

    fn schema() -> &'static TableSchema {
        &CONTENT_SCHEMA
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.lang.clone().into(),
            self.title.clone().into(),
            self.body.clone().into(),
            self.published_at.into(),
            self.tags.clone().into(),
            self.status.clone().into(),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFilter {
    #[serde(flatten)]
    pub paging: Paging,
    pub id: Option<String>,
    pub lang: Option<String>,
    pub title: Option<String>,
    pub published_at: Option<TimeRange>,
    #[serde(default, deserialize_with = "lenient::opt_list")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::opt_list")]
    pub status: Option<Vec<String>>,
}

impl SearchFilter for ContentFilter {
    fn paging(&self) -> &Paging {
        &self.paging
    }

    fn to_where(&self) -> (String, Vec<SqlValue>) {
        let mut w = WhereBuilder::new();
        w.eq("id", self.id.as_deref())
            .eq("lang", self.lang.as_deref())
            .prefix("title", self.title.as_deref(), false)
            .time_range("published_at", self.published_at.as_ref())
            .overlaps("tags", self.tags.as_deref())
            .any("status", self.status.as_deref());
        w.build()
    }
}
