//! API route handlers.

pub mod auth;
pub mod user;

use crate::auth::middleware::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};

/// Current unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Account endpoints
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/auth/direct-reset", patch(auth::direct_reset))
        // Session-gated endpoints
        .route("/api/user-data", get(user::get_user_data))
}
