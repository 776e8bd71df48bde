use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;

/// Wrapper for API responses that automatically adds success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self { data, status_code: None }
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self { data, status_code: Some(status_code) }
    }

    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }

    /// Map an affected-row count to a response: `>0` succeeds with `status`,
    /// `0` is not found and `-1` is a conflict.
    pub fn from_affected(affected: i64, data: T, status: StatusCode) -> Result<Self, ApiError> {
        match affected {
            n if n > 0 => Ok(Self::with_status(data, status)),
            0 => Err(ApiError::not_found("Record not found")),
            _ => Err(ApiError::conflict("Record was changed or is still in use")),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return ApiError::internal_server_error("Failed to serialize response data").into_response();
            }
        };

        let envelope = json!({
            "success": true,
            "data": data_value
        });

        (status, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_affected_rows() {
        let ok = ApiResponse::from_affected(1, 1, StatusCode::CREATED).unwrap();
        assert_eq!(ok.status_code, Some(StatusCode::CREATED));
        assert_eq!(ApiResponse::from_affected(0, 0, StatusCode::OK).unwrap_err().status_code(), 404);
        assert_eq!(ApiResponse::from_affected(-1, -1, StatusCode::OK).unwrap_err().status_code(), 409);
    }
}
