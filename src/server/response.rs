//! Error responses at the HTTP boundary

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::McpError;

/// Any error leaving a handler, rendered as `{"error", "kind"}`
#[derive(Debug)]
pub struct ApiError(pub McpError);

impl From<McpError> for ApiError {
    fn from(err: McpError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(McpError::InvalidParameters(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), "{}", self.0);
        } else {
            tracing::warn!(kind = self.0.kind(), "{}", self.0);
        }
        let body = json!({ "error": self.0.to_string(), "kind": self.0.kind() });
        (status, Json(body)).into_response()
    }
}
