use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Top-level application error. All variants carry a human-readable message
/// for display/logging; [`IntoResponse`] maps them onto the HTTP surface.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Field '{field_name}' exceeds max length of {max_length} (actual: {actual_length})")]
    FieldTooLong { field_name: String, max_length: usize, actual_length: usize },

    #[error("File '{name}' is too large: {size} bytes (limit {limit})")]
    FileTooLarge { name: String, size: usize, limit: usize },

    #[error("Unsupported file type: {mime_type}")]
    UnsupportedType { mime_type: String },

    #[error("Chat history must alternate user/model starting with user (position {position} is {found})")]
    InvalidSequence { position: usize, found: String },

    // ── Attachment / document errors ─────────────────────────────────────────
    #[error("Failed to read file: {message}")]
    FileReadError { message: String },

    // ── Model errors ─────────────────────────────────────────────────────────
    #[error("Model API unreachable at {host}")]
    ModelUnavailable { host: String },

    #[error("Model request failed: {message}")]
    ModelError { message: String },

    // ── Conversation / auth errors ───────────────────────────────────────────
    #[error("Conversation '{id}' not found")]
    ConversationNotFound { id: String },

    #[error("Not authorized to access this conversation")]
    Unauthorized,

    // ── Database errors ──────────────────────────────────────────────────────
    #[error("Database query failed: {message}")]
    DatabaseQueryFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn db_query(message: impl Into<String>, source: sqlx::Error) -> Self {
        AppError::DatabaseQueryFailed { message: message.into(), source }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::EmptyField { .. }
                | AppError::FieldTooLong { .. }
                | AppError::FileTooLarge { .. }
                | AppError::UnsupportedType { .. }
                | AppError::InvalidSequence { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::ConversationNotFound { .. })
    }

    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, AppError::ModelUnavailable { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        if self.is_validation() {
            StatusCode::BAD_REQUEST
        } else if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else if matches!(self, AppError::Unauthorized) {
            StatusCode::UNAUTHORIZED
        } else if self.is_model_unavailable() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::ModelError { message } => json!({
                "error": "Model request failed",
                "details": message,
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_400() {
        let err = AppError::FileTooLarge { name: "a.png".into(), size: 6_000_000, limit: 5_242_880 };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let err = AppError::InvalidSequence { position: 1, found: "user".into() };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn auth_and_lookup_errors_map_to_401_and_404() {
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        let err = AppError::ConversationNotFound { id: "c1".into() };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn model_errors_map_to_5xx() {
        let err = AppError::ModelUnavailable { host: "https://example.test".into() };
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let err = AppError::ModelError { message: "quota exceeded".into() };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
