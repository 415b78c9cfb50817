use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use techtalk_store::StoreError;

/// Handler error rendered as `{"detail": ...}` with a matching status.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Forbidden(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> &str {
        match self {
            ApiError::NotFound(d)
            | ApiError::Forbidden(d)
            | ApiError::BadRequest(d)
            | ApiError::Internal(d) => d,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, detail = %self.detail(), "http.handler.error");
        } else {
            tracing::debug!(%status, detail = %self.detail(), "http.handler.rejected");
        }
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::PostNotFound | StoreError::CommentNotFound => {
                ApiError::NotFound(e.to_string())
            }
            StoreError::PasswordMismatch | StoreError::CommentPasswordMismatch => {
                ApiError::Forbidden(e.to_string())
            }
            StoreError::MissingField(_) => ApiError::BadRequest(e.to_string()),
            StoreError::Hash(_) | StoreError::Database(_) | StoreError::Corrupt(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}
