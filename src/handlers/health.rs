use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;

/// GET /health reports 503 while the database cannot be reached
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if let Err(e) = DatabaseManager::health_check(&state.pool).await {
        tracing::warn!(error = %e, "health check failed");
        return Err(ApiError::service_unavailable("Database unavailable"));
    }

    Ok(Json(json!({
        "status": "ok",
        "environment": state.config.environment,
    })))
}
