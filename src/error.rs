//! Error types and Axum response conversions.
//!
//! Every failure response carries `success: false` and a stable
//! machine-checkable code next to the human-readable message:
//!
//! ```json
//! {"success": false, "error": {"code": "DUPLICATE_EMAIL", "message": "..."}}
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Registration collided with an existing email.
    #[error("Email already exists")]
    DuplicateEmail,

    /// Login failed. Covers both unknown email and wrong password so the
    /// response cannot be used for account enumeration.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No valid session accompanies the request.
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing required fields: {0}")]
    MissingFields(String),

    /// Session storage failed during logout.
    #[error("Could not log out")]
    SessionError,

    #[error("Rate limited")]
    RateLimited,

    /// Storage or hashing failure. The detail is logged server-side and
    /// never sent to the client.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable code for clients to branch on.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::MissingFields(_) => "MISSING_FIELDS",
            AppError::SessionError => "SESSION_ERROR",
            AppError::RateLimited => "RATE_LIMITED",
            AppError::Internal(_) => "SERVER_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::DuplicateEmail => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::MissingFields(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Missing required fields: {}", msg),
            ),
            AppError::SessionError => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
            ),
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

// Convenience conversions from common error types
impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Internal(format!("Redis error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Hashing error: {}", err))
    }
}
