//! Generic CRUD and search handlers, instantiated once per entity type in the
//! router (`get(entity::load::<Article>)`).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use validator::Validate;

use super::{audited, into_object, reconcile_keys};
use crate::app::AppState;
use crate::database::entity::Entity;
use crate::database::search::{query_to_json, SearchResult};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::AuditContext;

/// GET /{plural}/:id
pub async fn load<T: Entity>(
    State(state): State<AppState>,
    Path(path): Path<HashMap<String, String>>,
) -> ApiResult<T> {
    let keys = T::schema().keys_from_path(&path)?;
    match state.entities::<T>().load(&keys).await? {
        Some(entity) => Ok(ApiResponse::success(entity)),
        None => Err(ApiError::not_found(format!("{} not found", T::MODULE))),
    }
}

/// POST /{plural}
pub async fn create<T: Entity>(
    State(state): State<AppState>,
    audit: AuditContext,
    Json(body): Json<Value>,
) -> ApiResult<T> {
    let entity: T = serde_json::from_value(body)?;
    entity.validate()?;

    let result = state.entities::<T>().create(&entity).await;
    audited(&state, &audit, T::MODULE, "create", &result).await;

    match result? {
        n if n > 0 => Ok(ApiResponse::created(entity)),
        _ => Err(ApiError::conflict(format!("{} was not created", T::MODULE))),
    }
}

/// PUT /{plural}/:id
pub async fn update<T: Entity>(
    State(state): State<AppState>,
    audit: AuditContext,
    Path(path): Path<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> ApiResult<T> {
    let mut body = into_object(body)?;
    reconcile_keys(T::schema(), &path, &mut body)?;
    let entity: T = serde_json::from_value(Value::Object(body))?;
    entity.validate()?;

    let result = state.entities::<T>().update(&entity).await;
    audited(&state, &audit, T::MODULE, "update", &result).await;

    ApiResponse::from_affected(result?, entity, StatusCode::OK)
}

/// PATCH /{plural}/:id writes only the columns present in the body.
pub async fn patch<T: Entity>(
    State(state): State<AppState>,
    audit: AuditContext,
    Path(path): Path<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> ApiResult<Value> {
    let mut body = into_object(body)?;
    reconcile_keys(T::schema(), &path, &mut body)?;

    let result = state.entities::<T>().patch(&body).await;
    audited(&state, &audit, T::MODULE, "patch", &result).await;

    ApiResponse::from_affected(result?, Value::Object(body), StatusCode::OK)
}

/// DELETE /{plural}/:id
pub async fn delete<T: Entity>(
    State(state): State<AppState>,
    audit: AuditContext,
    Path(path): Path<HashMap<String, String>>,
) -> ApiResult<Value> {
    let keys = T::schema().keys_from_path(&path)?;

    let result = state.entities::<T>().delete(keys).await;
    audited(&state, &audit, T::MODULE, "delete", &result).await;

    let affected = result?;
    ApiResponse::from_affected(affected, json!({ "deleted": affected }), StatusCode::OK)
}

/// GET /{plural}/search with the filter in the query string
pub async fn search_get<T: Entity>(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<SearchResult<T>> {
    let filter: T::Filter = serde_json::from_value(query_to_json(params))?;
    Ok(ApiResponse::success(state.entities::<T>().search(&filter).await?))
}

/// POST /{plural}/search with the filter as the JSON body
pub async fn search_post<T: Entity>(
    State(state): State<AppState>,
    Json(filter): Json<Value>,
) -> ApiResult<SearchResult<T>> {
    let filter: T::Filter = serde_json::from_value(filter)?;
    Ok(ApiResponse::success(state.entities::<T>().search(&filter).await?))
}
