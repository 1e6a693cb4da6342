//! User Redis operations.
//!
//! Redis key patterns:
//! - `user:{nanoid}` — individual user data (JSON)
//! - `user_email:{email}` — lowercase email lookup to user_id (STRING)
//! - `user_phone:{phone}` — phone lookup to user_id (STRING)
//!
//! The email index is the authoritative uniqueness guard: `create_user`
//! claims it inside a Lua script, so two concurrent registrations with the
//! same email can never both succeed.
//!
//! ## Security: Zeroizing Sensitive Data
//!
//! This module uses the `zeroize` crate to clear user JSON (which carries
//! the password hash) from application memory after deserialization.

use crate::models::StoredUser;
use crate::storage::json_error;
use redis::AsyncCommands;
use zeroize::Zeroizing;

/// Lowercase an email for storage and lookup.
///
/// Registration with `X@Y.com` must authenticate as `x@y.com`.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Atomically create a user, claiming the email index.
///
/// Returns `Ok(false)` without writing anything if the normalized email is
/// already taken. The phone index is first-writer-wins: an existing
/// `user_phone` entry is left pointing at the earlier account.
///
/// The user's email must already be normalized (see [`normalize_email`]).
pub async fn create_user<C>(con: &mut C, user: &StoredUser) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let user_key = format!("user:{}", user.id);
    let email_key = format!("user_email:{}", user.email);
    let phone_key = format!("user_phone:{}", user.phone);

    let json = serde_json::to_string(user).map_err(|e| json_error("JSON serialize", e))?;

    // Claim the email index and write the record in one atomic step.
    // Scripts execute atomically in Redis, so there is no window between
    // the existence check and the writes.
    let script = redis::Script::new(
        r"
        if redis.call('EXISTS', KEYS[1]) == 1 then
            return 0
        end
        redis.call('SET', KEYS[1], ARGV[1])
        redis.call('SET', KEYS[2], ARGV[2])
        redis.call('SET', KEYS[3], ARGV[1], 'NX')
        return 1
        ",
    );

    let created: i32 = script
        .key(&email_key)
        .key(&user_key)
        .key(&phone_key)
        .arg(&user.id)
        .arg(json)
        .invoke_async(con)
        .await?;

    Ok(created == 1)
}

/// Get a user by ID.
///
/// The user JSON is zeroized after deserialization.
pub async fn get_user<C>(con: &mut C, id: &str) -> Result<Option<StoredUser>, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("user:{}", id);
    let json: Option<String> = con.get(&key).await?;

    match json {
        Some(data) => {
            // Wrap the JSON string in Zeroizing to clear it after use
            let zeroizing_data = Zeroizing::new(data);
            let user = serde_json::from_str(&zeroizing_data)
                .map_err(|e| json_error("JSON deserialize", e))?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

/// Get a user by email.
///
/// Normalizes the email, then performs a two-step lookup:
/// email -> user_id -> user data.
pub async fn find_user_by_email<C>(
    con: &mut C,
    email: &str,
) -> Result<Option<StoredUser>, redis::RedisError>
where
    C: AsyncCommands,
{
    let email_key = format!("user_email:{}", normalize_email(email));
    let user_id: Option<String> = con.get(&email_key).await?;

    match user_id {
        Some(id) => get_user(con, &id).await,
        None => Ok(None),
    }
}

/// Get a user by phone (exact match).
pub async fn find_user_by_phone<C>(
    con: &mut C,
    phone: &str,
) -> Result<Option<StoredUser>, redis::RedisError>
where
    C: AsyncCommands,
{
    let phone_key = format!("user_phone:{}", phone);
    let user_id: Option<String> = con.get(&phone_key).await?;

    match user_id {
        Some(id) => get_user(con, &id).await,
        None => Ok(None),
    }
}

/// Replace the password hash of the user holding `phone`.
///
/// Returns the updated user, or `Ok(None)` if no user has that phone.
/// Calling again with a different hash succeeds the same way.
pub async fn update_password<C>(
    con: &mut C,
    phone: &str,
    new_password_hash: &str,
) -> Result<Option<StoredUser>, redis::RedisError>
where
    C: AsyncCommands,
{
    let user = match find_user_by_phone(con, phone).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    let mut updated = user;
    updated.password_hash = new_password_hash.to_string();

    let user_key = format!("user:{}", updated.id);
    let json = serde_json::to_string(&updated).map_err(|e| json_error("JSON serialize", e))?;
    con.set::<_, _, ()>(&user_key, json).await?;

    Ok(Some(updated))
}
