//! Public API types

use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::core::{ChatError, Notice};

// Errors

pub struct ApiError(ChatError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            ChatError::Completion(_) => StatusCode::BAD_GATEWAY,
            ChatError::Configuration(_) | ChatError::Logging(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convert `ApiError` into an Axum compatible response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self.0);
        } else {
            tracing::debug!("Rejected request: {}", self.0);
        }
        (status, axum::Json(Notice::from(&self.0))).into_response()
    }
}

/// Enables using `?` on functions that return `Result<_, ChatError>`
/// to turn them into `Result<_, ApiError>`
impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

// Re-export public types from each route

pub mod chat {
    pub use crate::api::routes::chat::public::*;
}
