use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::database::entity::Entity;
use crate::database::schema::{Column, ColumnKind, TableSchema};
use crate::database::search::{lenient, Paging, SearchFilter, TimeRange, WhereBuilder};
use crate::database::value::SqlValue;

pub static ARTICLE_SCHEMA: TableSchema = TableSchema {
    table: "articles",
    columns: &[
        Column::new("id", "id", ColumnKind::Text).key(),
        Column::new("title", "title", ColumnKind::Text),
        Column::new("description", "description", ColumnKind::Text),
        Column::new("published_at", "publishedAt", ColumnKind::Timestamp),
        Column::new("content", "content", ColumnKind::Text),
        Column::new("thumbnail", "thumbnail", ColumnKind::Text),
        Column::new("tags", "tags", ColumnKind::TextArray),
        Column::new("status", "status", ColumnKind::Text),
    ],
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[validate(length(min = 1, max = 40))]
    pub id: String,
    #[validate(length(max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
    #[validate(length(max = 500))]
    pub thumbnail: Option<String>,
    pub tags: Option<Vec<String>>,
    #[validate(length(equal = 1))]
    pub status: Option<String>,
}

impl Entity for Article {
    type Filter = ArticleFilter;
    const MODULE: &'static str = "article";

    fn schema() -> &'static TableSchema {
        &ARTICLE_SCHEMA
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.title.clone().into(),
            self.description.clone().into(),
            self.published_at.into(),
            self.content.clone().into(),
            self.thumbnail.clone().into(),
            self.tags.clone().into(),
            self.status.clone().into(),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleFilter {
    #[serde(flatten)]
    pub paging: Paging,
    pub id: Option<String>,
    pub title: Option<String>,
    pub published_at: Option<TimeRange>,
    #[serde(default, deserialize_with = "lenient::opt_list")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::opt_list")]
    pub status: Option<Vec<String>>,
}

impl SearchFilter for ArticleFilter {
    fn paging(&self) -> &Paging {
        &self.paging
    }

    fn to_where(&self) -> (String, Vec<SqlValue>) {
        let mut w = WhereBuilder::new();
        w.eq("id", self.id.as_deref())
            .prefix("title", self.title.as_deref(), false)
            .time_range("published_at", self.published_at.as_ref())
            .overlaps("tags", self.tags.as_deref())
            .any("status", self.status.as_deref());
        w.build()
    }

    fn default_sort(&self) -> Option<&'static str> {
        Some("-publishedAt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_combines_every_field() {
        let filter: ArticleFilter = serde_json::from_value(json!({
            "id": "a1",
            "title": "Rust",
            "publishedAt": {"min": "2024-01-01T00:00:00Z", "max": "2024-12-31T00:00:00Z"},
            "tags": ["news"],
            "status": "A,D"
        }))
        .unwrap();
        let (sql, params) = filter.to_where();
        assert_eq!(
            sql,
            concat!(
                " where id = $1 and title like $2 and published_at >= $3",
                " and published_at <= $4 and tags && $5 and status = any($6)"
            )
        );
        assert_eq!(params[5], SqlValue::from(vec!["A".to_string(), "D".to_string()]));
    }

    #[test]
    fn rejects_long_ids() {
        let article: Article = serde_json::from_value(json!({"id": "x".repeat(41)})).unwrap();
        assert!(article.validate().is_err());
    }
}
