//! Error responses for the HTTP layer
//!
//! Bodies always carry a `kind` so clients can tell a missing resource from a
//! rejected submission without parsing messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::EcrfError;

#[derive(Debug)]
pub struct ApiError(pub EcrfError);

impl From<EcrfError> for ApiError {
    fn from(err: EcrfError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn body(&self) -> serde_json::Value {
        match &self.0 {
            EcrfError::NotFound { kind, id } => json!({
                "kind": "not_found",
                "resource": kind,
                "id": id,
                "message": self.0.to_string(),
            }),
            EcrfError::Validation(violations) => json!({
                "kind": "validation",
                "message": "Validation failed",
                "errors": violations,
            }),
            EcrfError::InvalidTemplate(id) => json!({
                "kind": "invalid_template",
                "id": id,
                "message": self.0.to_string(),
            }),
            other => json!({
                "kind": "internal",
                "code": other.code(),
                "message": other.to_string(),
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
