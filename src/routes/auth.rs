//! Auth API endpoints: register, login, logout, and password reset.

use crate::auth::middleware::{check_rate_limit, AppState};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{generate_session_token, SESSION_COOKIE};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    DirectResetRequest, LoginRequest, RegisterRequest, Role, StoredSession, StoredUser,
};
use crate::routes::unix_now;
use crate::storage;
use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;

/// Build the session cookie. HTTP-only and cross-site: the frontend is
/// served from a different origin than this API.
fn session_cookie(token: &str, config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::None)
        .max_age(time::Duration::seconds(config.session_ttl_secs as i64))
        .build()
}

/// Build an immediately-expiring cookie that instructs the client to
/// discard its session token.
fn expired_session_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::None)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Hash of a client IP for rate-limit logging (raw IPs stay out of logs).
fn ip_hash(addr: &SocketAddr) -> String {
    let mut hasher = std::hash::DefaultHasher::new();
    addr.ip().hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// Run bcrypt work on the blocking thread pool so it cannot starve the
/// async workers.
async fn run_blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, bcrypt::BcryptError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

/// POST /api/register — Create a new account
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut missing = Vec::new();
    for (field, value) in [
        ("name", &req.name),
        ("email", &req.email),
        ("password", &req.password),
        ("phone", &req.phone),
    ] {
        if value.trim().is_empty() {
            missing.push(field);
        }
    }
    if !missing.is_empty() {
        return Err(AppError::MissingFields(missing.join(", ")));
    }

    // Unknown role strings fall back to Customer rather than failing the request
    let role = req
        .role
        .as_deref()
        .and_then(|r| r.parse::<Role>().ok())
        .unwrap_or_default();

    let email = storage::user::normalize_email(&req.email);

    let mut con = state.redis_con().await?;

    // Cheap duplicate check before paying for the hash. The atomic create
    // below is the authoritative guard against concurrent registrations.
    if storage::user::find_user_by_email(&mut con, &email)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateEmail);
    }

    let cost = state.config.bcrypt_cost;
    let password = req.password;
    let password_hash = run_blocking(move || hash_password(&password, cost)).await?;

    let user = StoredUser {
        id: nanoid::nanoid!(12),
        name: req.name.trim().to_string(),
        email,
        password_hash,
        phone: req.phone.trim().to_string(),
        role,
        balance: 0.0,
        created_at: unix_now(),
    };

    let created = storage::user::create_user(&mut con, &user).await?;
    if !created {
        // Lost the race to a concurrent registration with the same email
        return Err(AppError::DuplicateEmail);
    }

    tracing::info!(action = "user_registered", user_id = %user.id, role = %user.role, "New account created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Account created successfully"
        })),
    ))
}

/// POST /api/login — Verify credentials and create a session
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut con = state.redis_con().await?;

    let rate_limit_key = format!("ratelimit:login:{}", addr.ip());
    let allowed = check_rate_limit(
        &mut con,
        &rate_limit_key,
        state.config.rate_limit_auth_per_min,
        60,
    )
    .await?;
    if !allowed {
        tracing::warn!(action = "rate_limited", endpoint = "login", ip_hash = %ip_hash(&addr), "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    // Unknown email, empty credentials, and wrong password all resolve to
    // the same InvalidCredentials outcome; the response must not reveal
    // which accounts exist.
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let user = storage::user::find_user_by_email(&mut con, &req.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let password = req.password;
    let stored_hash = user.password_hash.clone();
    let valid = run_blocking(move || verify_password(&password, &stored_hash)).await?;

    if !valid {
        tracing::warn!(action = "login_failed", user_id = %user.id, "Password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    let token = generate_session_token();
    let session = StoredSession {
        token: token.clone(),
        user_id: user.id.clone(),
        name: user.name.clone(),
        role: user.role,
        created_at: unix_now(),
    };

    // The session must be durably recorded before the success response
    storage::session::store_session(&mut con, &session, state.config.session_ttl_secs).await?;

    tracing::info!(action = "login_success", user_id = %user.id, role = %user.role, "User authenticated");

    Ok((
        jar.add(session_cookie(&token, &state.config)),
        Json(serde_json::json!({
            "success": true,
            "message": "Logged in successfully"
        })),
    ))
}

/// POST /api/logout — Destroy the current session
///
/// Destroying a session that no longer exists (double logout, expired
/// token) still succeeds; only a storage failure is an error.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let mut con = state.redis_con().await.map_err(|_| AppError::SessionError)?;

    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        let session = storage::session::get_session(&mut con, &token)
            .await
            .map_err(|_| AppError::SessionError)?;

        if let Some(session) = session {
            storage::session::delete_session(&mut con, &token, &session.user_id)
                .await
                .map_err(|_| AppError::SessionError)?;
            tracing::info!(action = "logout", user_id = %session.user_id, "User logged out");
        }
    }

    Ok((
        jar.add(expired_session_cookie(&state.config)),
        Json(serde_json::json!({
            "success": true,
            "message": "Logged out"
        })),
    ))
}

/// PATCH /api/auth/direct-reset — Set a new password given a phone number
///
/// No proof of phone ownership is required on this path, so it shares the
/// login rate limit and a successful reset revokes the user's live
/// sessions.
pub async fn direct_reset(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<DirectResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut missing = Vec::new();
    if req.phone.trim().is_empty() {
        missing.push("phone");
    }
    if req.new_password.is_empty() {
        missing.push("newPassword");
    }
    if !missing.is_empty() {
        return Err(AppError::MissingFields(missing.join(", ")));
    }

    let mut con = state.redis_con().await?;

    let rate_limit_key = format!("ratelimit:reset:{}", addr.ip());
    let allowed = check_rate_limit(
        &mut con,
        &rate_limit_key,
        state.config.rate_limit_auth_per_min,
        60,
    )
    .await?;
    if !allowed {
        tracing::warn!(action = "rate_limited", endpoint = "direct-reset", ip_hash = %ip_hash(&addr), "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    // Look up before hashing to avoid the work for unknown phones
    if storage::user::find_user_by_phone(&mut con, req.phone.trim())
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let cost = state.config.bcrypt_cost;
    let new_password = req.new_password;
    let new_hash = run_blocking(move || hash_password(&new_password, cost)).await?;

    let updated = storage::user::update_password(&mut con, req.phone.trim(), &new_hash)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    // Old logins must not outlive the old password
    storage::session::delete_user_sessions(&mut con, &updated.id).await?;

    tracing::info!(action = "password_reset", user_id = %updated.id, "Password reset by phone");

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Password updated successfully"
    })))
}
