//! Redis storage layer for users, sessions, and transactions.
//!
//! All functions are async and use redis::AsyncCommands.
//! Data is serialized to JSON for storage in Redis.
//!
//! Uniqueness invariants (email, transaction receipt) are enforced here
//! with atomic Lua scripts rather than application-level check-then-insert,
//! so two concurrent writers cannot both pass an existence check.

pub mod session;
pub mod transaction;
pub mod user;

/// Wrap a serde_json error in a RedisError so storage functions have a
/// single error type.
pub(crate) fn json_error(context: &'static str, e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, context, e.to_string()))
}
