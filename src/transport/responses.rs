//! JSON envelopes and error mapping for the HTTP façade
//!
//! Success bodies are the service results serialized as-is. Every error is
//! answered with an `{ "error": ... }` object:
//!
//! | Error | Status | `error` |
//! |---|---|---|
//! | [`ApiError::Validation`] | 400 | descriptive message |
//! | [`ApiError::Transport`] | 500 | `Internal Server Error` |
//! | [`ApiError::Unexpected`] | 500 | `Internal Server Error` |
//! | unmatched route | 404 | `Not Found`, plus an `apis` list |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::services::ServiceError;

pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";
pub const NOT_FOUND: &str = "Not Found";

/// Body of every error response except 404
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of the 404 response, listing the routes that do exist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotFoundResponse {
    pub error: String,
    pub apis: Vec<String>,
}

/// Errors a handler can answer with
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or out-of-bound request parameters
    #[error("{0}")]
    Validation(String),

    /// An upstream call failed
    #[error("{0}")]
    Transport(String),

    /// Anything without a usable error shape, e.g. a panic
    #[error("An unexpected error occurred")]
    Unexpected,
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        if err.is_validation() {
            ApiError::Validation(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(message) => {
                tracing::debug!("rejecting request: {}", message);
                (StatusCode::BAD_REQUEST, message)
            }
            ApiError::Transport(detail) => {
                tracing::error!("upstream request failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_SERVER_ERROR.to_string(),
                )
            }
            ApiError::Unexpected => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_SERVER_ERROR.to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
