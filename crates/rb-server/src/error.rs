//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`rb_core::Error`] so that route handlers
//! can return `Result<T, AppError>` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError(pub rb_core::Error);

impl From<rb_core::Error> for AppError {
    fn from(e: rb_core::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Server error in API handler");
        }

        let code = match &self.0 {
            rb_core::Error::NotFound { .. } => "not_found",
            rb_core::Error::Unauthorized(_) => "unauthorized",
            rb_core::Error::Forbidden(_) => "forbidden",
            rb_core::Error::Validation(_) => "validation_error",
            rb_core::Error::Conflict(_) => "conflict",
            rb_core::Error::Database { .. } => "database_error",
            rb_core::Error::Io { .. } => "io_error",
            rb_core::Error::Tool { .. } => "tool_error",
            rb_core::Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.0.to_string(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
