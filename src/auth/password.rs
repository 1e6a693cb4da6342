//! Password hashing and verification.
//!
//! bcrypt with a configurable work factor (default 12). Hashing is
//! deliberately slow; handlers run it under `tokio::task::spawn_blocking`
//! so it cannot starve the async workers.

use bcrypt::{hash, verify, BcryptError};

/// Hash a password with the given bcrypt work factor.
///
/// Each call salts independently, so hashing the same password twice
/// produces different strings.
pub fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    hash(password, cost)
}

/// Verify a password against a stored bcrypt hash.
///
/// Returns `Ok(false)` for a well-formed hash that doesn't match;
/// `Err` only when the stored hash itself is malformed.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, BcryptError> {
    verify(password, password_hash)
}
