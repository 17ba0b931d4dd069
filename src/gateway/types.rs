//! API response envelope and error mapping
//!
//! Every endpoint returns `{code, msg, data}`; `code` is "OK" on
//! success and the engine's error code otherwise.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::engine::EngineError;

/// Unified API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: String,
    pub msg: String,
    /// Present only on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: "OK".to_string(),
            msg: "ok".to_string(),
            data: Some(data),
        }
    }
}

/// Handler result alias
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Success helper
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// API error with HTTP status and stable code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_PARAMETER", msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "MISSING_ACTOR", msg)
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, e.code(), e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiResponse::<()> {
            code: self.code,
            msg: self.msg,
            data: None,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_maps_status_and_code() {
        let api: ApiError = EngineError::Unauthorized.into();
        assert_eq!(api.status, StatusCode::FORBIDDEN);
        assert_eq!(api.code, "UNAUTHORIZED");

        let api: ApiError = EngineError::TransactionNotFound("x".into()).into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);

        let api: ApiError = EngineError::VersionConflict.into();
        assert_eq!(api.status, StatusCode::CONFLICT);
    }
}
