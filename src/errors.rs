use crate::services::media_service::MediaError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for handler errors that keeps the message local.
///
/// Rendered as the API's failure envelope: `{ "success": false, "error": … }`.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.message, "request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

/// Every media-host failure kind maps to 500 to keep the endpoint contract;
/// the kind still reaches the caller through the message text.
impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}
