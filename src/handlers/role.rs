use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use validator::Validate;

use super::{audited, into_object, reconcile_keys};
use crate::app::AppState;
use crate::database::models::privilege::Privilege;
use crate::database::models::role::{Role, RoleCode, RoleFilter, ROLE_SCHEMA};
use crate::database::search::{query_to_json, SearchResult};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::AuditContext;

const RESOURCE: &str = "role";

fn role_path(role_id: String) -> HashMap<String, String> {
    HashMap::from([("roleId".to_string(), role_id)])
}

/// GET /roles/:role_id returns the role with its privileges
pub async fn load(State(state): State<AppState>, Path(role_id): Path<String>) -> ApiResult<Role> {
    match state.roles().load(&role_id).await? {
        Some(role) => Ok(ApiResponse::success(role)),
        None => Err(ApiError::not_found("role not found")),
    }
}

/// POST /roles
pub async fn create(
    State(state): State<AppState>,
    audit: AuditContext,
    Json(body): Json<Value>,
) -> ApiResult<Role> {
    let mut role: Role = serde_json::from_value(body)?;
    let now = Utc::now();
    role.created_by = audit.user_id.clone();
    role.created_at = Some(now);
    role.updated_by = audit.user_id.clone();
    role.updated_at = Some(now);
    role.validate()?;

    let result = state.roles().create(&mut role).await;
    audited(&state, &audit, RESOURCE, "create", &result).await;

    match result? {
        n if n > 0 => Ok(ApiResponse::created(role)),
        _ => Err(ApiError::conflict("role was not created")),
    }
}

/// PUT /roles/:role_id replaces the role and its privileges
pub async fn update(
    State(state): State<AppState>,
    audit: AuditContext,
    Path(role_id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Role> {
    let mut body = into_object(body)?;
    reconcile_keys(&ROLE_SCHEMA, &role_path(role_id), &mut body)?;
    let mut role: Role = serde_json::from_value(Value::Object(body))?;
    role.updated_by = audit.user_id.clone();
    role.updated_at = Some(Utc::now());
    role.validate()?;

    let result = state.roles().update(&role).await;
    audited(&state, &audit, RESOURCE, "update", &result).await;

    ApiResponse::from_affected(result?, role, StatusCode::OK)
}

/// PATCH /roles/:role_id
pub async fn patch(
    State(state): State<AppState>,
    audit: AuditContext,
    Path(role_id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Value> {
    let mut body = into_object(body)?;
    reconcile_keys(&ROLE_SCHEMA, &role_path(role_id), &mut body)?;
    if let Some(user_id) = &audit.user_id {
        body.insert("updatedBy".to_string(), Value::String(user_id.clone()));
    }
    body.insert("updatedAt".to_string(), Value::String(Utc::now().to_rfc3339()));

    let result = state.roles().patch(&body).await;
    audited(&state, &audit, RESOURCE, "patch", &result).await;

    ApiResponse::from_affected(result?, Value::Object(body), StatusCode::OK)
}

/// DELETE /roles/:role_id, refused while users still hold the role
pub async fn delete(
    State(state): State<AppState>,
    audit: AuditContext,
    Path(role_id): Path<String>,
) -> ApiResult<Value> {
    let result = state.roles().delete(&role_id).await;
    audited(&state, &audit, RESOURCE, "delete", &result).await;

    match result? {
        -1 => Err(ApiError::conflict("role is still assigned to users")),
        n => ApiResponse::from_affected(n, json!({ "roleId": role_id }), StatusCode::OK),
    }
}

/// PUT /roles/:role_id/assign replaces the set of users holding the role
pub async fn assign(
    State(state): State<AppState>,
    audit: AuditContext,
    Path(role_id): Path<String>,
    Json(users): Json<Vec<String>>,
) -> ApiResult<Value> {
    let roles = state.roles();
    if roles.load(&role_id).await?.is_none() {
        return Err(ApiError::not_found("role not found"));
    }

    let result = roles.assign(&role_id, &users).await;
    // An empty assignment on an unassigned role touches no rows but still succeeds.
    audited(&state, &audit, RESOURCE, "assign", &result.as_ref().map(|n| (*n).max(1))).await;

    let affected = result?;
    Ok(ApiResponse::success(json!({ "roleId": role_id, "users": users, "affected": affected })))
}

/// GET /roles/:role_id/users
pub async fn users(State(state): State<AppState>, Path(role_id): Path<String>) -> ApiResult<Vec<String>> {
    Ok(ApiResponse::success(state.roles().users(&role_id).await?))
}

/// GET /roles lists every role as a code/label pair
pub async fn codes(State(state): State<AppState>) -> ApiResult<Vec<RoleCode>> {
    Ok(ApiResponse::success(state.roles().codes().await?))
}

pub async fn search_get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<SearchResult<Role>> {
    let filter: RoleFilter = serde_json::from_value(query_to_json(params))?;
    Ok(ApiResponse::success(state.roles().search(&filter).await?))
}

pub async fn search_post(State(state): State<AppState>, Json(filter): Json<Value>) -> ApiResult<SearchResult<Role>> {
    let filter: RoleFilter = serde_json::from_value(filter)?;
    Ok(ApiResponse::success(state.roles().search(&filter).await?))
}

/// GET /privileges lists every grantable module
pub async fn privileges(State(state): State<AppState>) -> ApiResult<Vec<Privilege>> {
    Ok(ApiResponse::success(state.roles().catalog().await?))
}

/// GET /my-privileges: merged privileges of the caller's active roles, or
/// the whole catalog when authentication is switched off.
pub async fn my_privileges(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
) -> ApiResult<Vec<Privilege>> {
    let Some(Extension(user)) = user else {
        return Ok(ApiResponse::success(state.roles().catalog().await?));
    };
    Ok(ApiResponse::success(state.roles().privileges_of(&user.user_id).await?))
}
