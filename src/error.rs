use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::captions::services::CaptionError;

/// Error taxonomy for the HTTP surface. Client faults and server faults map
/// to distinct status codes; auth failures stay uniform so a caller cannot
/// probe which check failed.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} already registered")]
    Conflict(&'static str),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(String),
    #[error("could not decode image: {0}")]
    BadImage(String),
    #[error("caption model failed")]
    Inference(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadImage(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidCredentials | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Inference(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<CaptionError> for ApiError {
    fn from(e: CaptionError) -> Self {
        match e {
            CaptionError::Decode(msg) => ApiError::BadImage(msg),
            CaptionError::Inference(msg) => ApiError::Inference(msg),
            CaptionError::Database(e) => ApiError::Internal(e),
        }
    }
}
