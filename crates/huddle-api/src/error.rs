use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use huddle_types::api::ErrorBody;

/// Every failure a handler can report. The display text is what the client
/// sees in `{"error": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Email or username already taken.
    #[error("User already exists")]
    Conflict,

    /// Login failed. Unknown email and wrong password share this variant so
    /// callers cannot tell them apart.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, malformed, badly signed or expired session token.
    #[error("{0}")]
    Unauthorized(String),

    /// Persistence or token-signing failure. Detail is logged, not returned.
    #[error("Server error")]
    Store,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Log `err` and collapse it to an opaque 500.
    pub fn store(err: impl std::fmt::Display) -> Self {
        error!("Store error: {}", err);
        Self::Store
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Store => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        Self::validation("Invalid group id")
    }
}
