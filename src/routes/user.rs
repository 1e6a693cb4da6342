//! Session-gated user endpoints.

use crate::auth::middleware::{AppState, AuthSession};
use crate::error::AppError;
use crate::models::UserProfile;
use crate::storage;
use axum::{extract::State, response::IntoResponse, Json};

/// GET /api/user-data — Current user's profile
///
/// Re-fetches the full record by id instead of trusting the session's
/// cached projection, so name/role changes since login are reflected.
pub async fn get_user_data(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut con = state.redis_con().await?;

    // A lingering session for a deleted account is just "not logged in"
    let user = storage::user::get_user(&mut con, &session.user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "user": UserProfile::from(user)
    })))
}
