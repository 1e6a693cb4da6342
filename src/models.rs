//! Request, response, and storage models for the API.
//!
//! All models use serde for serialization/deserialization.
//! Storage models represent Redis data structures.

use serde::{Deserialize, Serialize};

// ============================================================================
// Auth Models
// ============================================================================

/// Request to register a new account.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: String,
    /// Optional role name. Unknown values fall back to [`Role::Customer`].
    #[serde(default)]
    pub role: Option<String>,
}

/// Request to log in with email and password.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request to reset a password by phone number.
#[derive(Debug, Deserialize)]
pub struct DirectResetRequest {
    #[serde(default)]
    pub phone: String,
    #[serde(default, rename = "newPassword")]
    pub new_password: String,
}

/// User projection returned to authenticated callers.
///
/// Deliberately has no password field under any key.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub balance: f64,
    pub created_at: u64,
}

impl From<StoredUser> for UserProfile {
    fn from(user: StoredUser) -> Self {
        UserProfile {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            balance: user.balance,
            created_at: user.created_at,
        }
    }
}

// ============================================================================
// Storage Models
// ============================================================================

/// User data as stored in Redis.
///
/// `password_hash` is a bcrypt hash; plaintext passwords are never stored.
/// This struct is never serialized into a response — callers get
/// [`UserProfile`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: String,
    pub name: String,
    /// Always lowercase; normalized before storage and lookup.
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub role: Role,
    pub balance: f64,
    pub created_at: u64,
}

/// Session data as stored in Redis.
///
/// Carries a minimal projection of the user (id, name, role), never the
/// password hash. The authoritative user record is re-fetched on each
/// profile request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub created_at: u64,
}

/// Transaction data as stored in Redis.
///
/// Records are created and transitioned by the external payments service;
/// this backend owns only the shape and the receipt uniqueness invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: String,
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: f64,
    pub status: TransactionStatus,
    /// Mobile-money receipt number (e.g. "RLE73S8D9"). Unique when present;
    /// any number of records may omit it.
    pub receipt: Option<String>,
    pub description: String,
    pub created_at: u64,
}

/// Description for transactions created without one.
pub const DEFAULT_TRANSACTION_DESCRIPTION: &str = "RideWithMeru Transaction";

// ============================================================================
// User Roles
// ============================================================================

/// Account role types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Customer,
    Rider,
    Retailer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Rider => "Rider",
            Role::Retailer => "Retailer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" => Ok(Role::Customer),
            "Rider" => Ok(Role::Rider),
            "Retailer" => Ok(Role::Retailer),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// ============================================================================
// Transaction Enums
// ============================================================================

/// The kind of balance movement a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Payment,
}

/// Settlement status of a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}
