use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::database::entity::Entity;
use crate::database::schema::{Column, ColumnKind, TableSchema};
use crate::database::search::{lenient, Paging, SearchFilter, WhereBuilder};
use crate::database::value::SqlValue;

/// Menu/category tree. Writes are guarded by the `version` column.
pub static CATEGORY_SCHEMA: TableSchema = TableSchema {
    table: "categories",
    columns: &[
        Column::new("id", "id", ColumnKind::Text).key(),
        Column::new("name", "name", ColumnKind::Text),
        Column::new("path", "path", ColumnKind::Text),
        Column::new("resource_key", "resource", ColumnKind::Text),
        Column::new("icon", "icon", ColumnKind::Text),
        Column::new("sequence", "sequence", ColumnKind::Int4),
        Column::new("type", "type", ColumnKind::Text),
        Column::new("parent", "parent", ColumnKind::Text),
        Column::new("status", "status", ColumnKind::Text),
        Column::new("version", "version", ColumnKind::Int4).version(),
    ],
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[validate(length(min = 1, max = 40))]
    pub id: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub path: Option<String>,
    #[sqlx(rename = "resource_key")]
    pub resource: Option<String>,
    pub icon: Option<String>,
    pub sequence: Option<i32>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub category_type: Option<String>,
    pub parent: Option<String>,
    #[validate(length(equal = 1))]
    pub status: Option<String>,
    /// Ignored on insert; on update it must match the stored version
    #[serde(default)]
    pub version: i32,
}

impl Entity for Category {
    type Filter = CategoryFilter;
    const MODULE: &'static str = "category";

    fn schema() -> &'static TableSchema {
        &CATEGORY_SCHEMA
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.name.clone().into(),
            self.path.clone().into(),
            self.resource.clone().into(),
            self.icon.clone().into(),
            self.sequence.into(),
            self.category_type.clone().into(),
            self.parent.clone().into(),
            self.status.clone().into(),
            self.version.into(),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFilter {
    #[serde(flatten)]
    pub paging: Paging,
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub category_type: Option<String>,
    pub parent: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_list")]
    pub status: Option<Vec<String>>,
}

impl SearchFilter for CategoryFilter {
    fn paging(&self) -> &Paging {
        &self.paging
    }

    fn to_where(&self) -> (String, Vec<SqlValue>) {
        let mut w = WhereBuilder::new();
        w.eq("id", self.id.as_deref())
            .contains("name", self.name.as_deref())
            .eq("type", self.category_type.as_deref())
            .eq("parent", self.parent.as_deref())
            .any("status", self.status.as_deref());
        w.build()
    }

    fn default_sort(&self) -> Option<&'static str> {
        Some("sequence")
    }
}
