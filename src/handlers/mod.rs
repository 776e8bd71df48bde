// HTTP handlers: decode, validate, call a service, map the result to a status.
pub mod audit_log;
pub mod entity;
pub mod health;
pub mod role;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::convert::Infallible;

use crate::app::AppState;
use crate::database::schema::TableSchema;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::AuditContext;

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuditContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts.extensions.get::<AuthUser>().map(|u| u.user_id.clone());
        let ip = parts
            .headers
            .get("x-forwarded-for")
            .or_else(|| parts.headers.get("x-real-ip"))
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(AuditContext { user_id, ip })
    }
}

/// Writes the audit record for a mutation before its result is mapped.
pub(crate) async fn audited<E: std::fmt::Display>(
    state: &AppState,
    ctx: &AuditContext,
    resource: &str,
    action: &str,
    result: &Result<i64, E>,
) {
    let (success, remark) = match result {
        Ok(n) => (*n > 0, format!("affected {}", n)),
        Err(e) => (false, e.to_string()),
    };
    state.audit().write(ctx, resource, action, success, remark).await;
}

/// Body must be a JSON object
pub(crate) fn into_object(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}

/// Make the body's key fields agree with the URL: a missing or empty key is
/// taken from the path, a different one is rejected.
pub(crate) fn reconcile_keys(
    schema: &TableSchema,
    path: &HashMap<String, String>,
    body: &mut Map<String, Value>,
) -> Result<(), ApiError> {
    for column in schema.keys() {
        let Some(from_path) = path.get(column.json) else {
            return Err(ApiError::bad_request(format!("{} must be in path", column.json)));
        };
        match body.get(column.json) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s.is_empty() => {}
            Some(Value::String(s)) if s == from_path => continue,
            Some(_) => {
                return Err(ApiError::bad_request(format!("{} in body does not match the path", column.json)));
            }
        }
        body.insert(column.json.to_string(), Value::String(from_path.clone()));
    }
    Ok(())
}
