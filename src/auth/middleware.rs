//! Axum extractors for authentication and rate limiting.

use crate::auth::session::SESSION_COOKIE;
use crate::config::Config;
use crate::error::AppError;
use crate::models::Role;
use crate::storage;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;
use redis::AsyncCommands;
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub redis: redis::Client,
    pub config: Arc<Config>,
}

impl AppState {
    /// Get a multiplexed async Redis connection.
    pub async fn redis_con(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        self.redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection error: {}", e)))
    }
}

/// Authenticated session extractor.
///
/// Extracts the session token from the `meru_session` cookie and resolves
/// it against the session store. Returns 401 Unauthenticated if the cookie
/// is missing or no live session matches — an expired session key is simply
/// gone from Redis, so both cases land in the same branch.
pub struct AuthSession {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(AppError::Unauthenticated)?;

        let mut con = state.redis_con().await?;

        let session = storage::session::get_session(&mut con, &token)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        Ok(AuthSession {
            user_id: session.user_id,
            name: session.name,
            role: session.role,
            token,
        })
    }
}

/// Check rate limit using Redis INCR with TTL.
///
/// # Arguments
/// * `con` - Redis connection
/// * `key` - Rate limit key (e.g., "ratelimit:login:127.0.0.1")
/// * `max` - Maximum requests allowed in window
/// * `window_secs` - Time window in seconds
///
/// # Returns
/// * `Ok(true)` if under limit
/// * `Ok(false)` if limit exceeded
pub async fn check_rate_limit<C>(
    con: &mut C,
    key: &str,
    max: u32,
    window_secs: u64,
) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    // Increment counter
    let count: u32 = con.incr(key, 1).await?;

    // Set TTL on first request
    if count == 1 {
        con.expire::<_, ()>(key, window_secs as i64).await?;
    }

    Ok(count <= max)
}
