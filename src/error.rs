/**
 * Error types
 * Request-level failures and their JSON representation
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::backend::BackendError;
use crate::media::MediaError;

/// Error body shared by every JSON endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    /// Form input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("invalid multipart data: {0}")]
    Multipart(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Backend(BackendError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            AppError::Backend(_) | AppError::Media(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Text shown to the caller. Upstream detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Backend(e) => e.user_message(),
            AppError::Media(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        AppError::Multipart(e.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ErrorResponse::new(self.public_message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("Title is required".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Backend(BackendError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Backend(BackendError::Decode("x".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::NotFound("Event".into()).to_string(),
            "Event not found"
        );
    }

    #[test]
    fn test_error_response_omits_empty_message() {
        let json = serde_json::to_string(&ErrorResponse::new("No file provided")).unwrap();
        assert_eq!(json, r#"{"error":"No file provided"}"#);
    }
}
