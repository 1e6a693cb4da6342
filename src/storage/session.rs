//! Session Redis operations.
//!
//! Redis key patterns:
//! - `session:{token}` — session data (JSON), expires with the session TTL
//! - `user_sessions:{user_id}` — set of the user's live tokens (SET)
//!
//! Sessions live in Redis, not in process memory, so any server instance
//! behind a load balancer can validate a token. Expiry is Redis TTL: an
//! expired session simply stops existing and resolves to unauthenticated.
//!
//! ## Security: Zeroizing Sensitive Data
//!
//! Session JSON is zeroized after deserialization. Redis stores data in its
//! own memory space, so zeroize only protects the Rust application's memory.

use crate::models::StoredSession;
use crate::storage::json_error;
use redis::AsyncCommands;
use zeroize::Zeroizing;

/// Store a session in Redis with TTL.
///
/// Also adds the session token to the user's session tracking set
/// (`user_sessions:{user_id}`) for efficient revocation on password reset.
///
/// Callers must await this before reporting a successful login: the
/// session record has to be durable before the client is told it exists.
pub async fn store_session<C>(
    con: &mut C,
    session: &StoredSession,
    ttl_secs: u64,
) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let session_key = format!("session:{}", session.token);
    let user_sessions_key = format!("user_sessions:{}", session.user_id);

    let json = serde_json::to_string(session).map_err(|e| json_error("JSON serialize", e))?;

    // Store session with TTL
    con.set_ex::<_, _, ()>(&session_key, json, ttl_secs).await?;

    // Track session token in user's session set
    con.sadd::<_, _, ()>(&user_sessions_key, &session.token)
        .await?;
    // Keep the set alive at least as long as the session
    con.expire::<_, ()>(&user_sessions_key, ttl_secs as i64)
        .await?;

    Ok(())
}

/// Get a session by token.
///
/// The session JSON is zeroized after deserialization.
pub async fn get_session<C>(
    con: &mut C,
    token: &str,
) -> Result<Option<StoredSession>, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("session:{}", token);
    let json: Option<String> = con.get(&key).await?;

    match json {
        Some(data) => {
            // Wrap the JSON string in Zeroizing to clear it after use
            let zeroizing_data = Zeroizing::new(data);
            let session = serde_json::from_str(&zeroizing_data)
                .map_err(|e| json_error("JSON deserialize", e))?;
            Ok(Some(session))
        }
        None => Ok(None),
    }
}

/// Delete a session from Redis.
///
/// Also removes the token from the user's session tracking set.
/// Returns true if the session was deleted, false if it didn't exist —
/// deleting an absent session is not an error.
pub async fn delete_session<C>(
    con: &mut C,
    token: &str,
    user_id: &str,
) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("session:{}", token);
    let deleted: i32 = con.del(&key).await?;

    // Remove from user's session tracking set
    let user_sessions_key = format!("user_sessions:{}", user_id);
    con.srem::<_, _, ()>(&user_sessions_key, token).await?;

    Ok(deleted > 0)
}

/// Delete all sessions for a user.
///
/// Uses the `user_sessions:{user_id}` tracking set for O(1) lookup
/// instead of scanning all session keys. Used when a password reset
/// revokes existing logins.
pub async fn delete_user_sessions<C>(con: &mut C, user_id: &str) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let user_sessions_key = format!("user_sessions:{}", user_id);

    // Get all session tokens for this user
    let tokens: Vec<String> = con.smembers(&user_sessions_key).await?;

    // Delete each session key
    for token in &tokens {
        let session_key = format!("session:{}", token);
        con.del::<_, ()>(&session_key).await?;
    }

    // Delete the tracking set itself
    con.del::<_, ()>(&user_sessions_key).await?;

    Ok(())
}
