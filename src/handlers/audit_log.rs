use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

use crate::app::AppState;
use crate::database::models::audit_log::{AuditLog, AuditLogFilter};
use crate::database::search::{query_to_json, SearchResult};
use crate::middleware::{ApiResponse, ApiResult};

pub async fn search_get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<SearchResult<AuditLog>> {
    let filter: AuditLogFilter = serde_json::from_value(query_to_json(params))?;
    run(&state, &filter).await
}

pub async fn search_post(
    State(state): State<AppState>,
    Json(filter): Json<Value>,
) -> ApiResult<SearchResult<AuditLog>> {
    let filter: AuditLogFilter = serde_json::from_value(filter)?;
    run(&state, &filter).await
}

async fn run(state: &AppState, filter: &AuditLogFilter) -> ApiResult<SearchResult<AuditLog>> {
    Ok(ApiResponse::success(state.audit().search(filter, &state.config.search).await?))
}
