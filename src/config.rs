//! Server configuration loaded from environment variables.
//!
//! Everything that varied between deployment revisions of the original
//! service (allowed origins, cookie flags, session TTL) lives in one
//! structure so the bootstrap never re-derives it.

use std::env;
use std::net::SocketAddr;

/// Work factor bounds accepted by bcrypt.
const BCRYPT_COST_MIN: u32 = 4;
const BCRYPT_COST_MAX: u32 = 31;

#[derive(Clone)]
pub struct Config {
    // Redis
    pub redis_url: String,

    // Server
    pub bind_addr: SocketAddr,

    // Sessions
    pub session_ttl_secs: u64,
    /// Whether the session cookie is marked Secure. Disable only for
    /// plain-HTTP local development.
    pub cookie_secure: bool,

    // Password hashing
    pub bcrypt_cost: u32,

    // CORS
    pub allowed_origins: Vec<String>,

    // Rate limiting
    pub rate_limit_auth_per_min: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("redis_url", &"[REDACTED]")
            .field("bind_addr", &self.bind_addr)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("cookie_secure", &self.cookie_secure)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_auth_per_min", &self.rate_limit_auth_per_min)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        // Redis — required to prevent silent unauthenticated connections
        let redis_url =
            env::var("REDIS_URL").map_err(|_| ConfigError::MissingVar("REDIS_URL".to_string()))?;

        if redis_url.is_empty() {
            return Err(ConfigError::InvalidValue(
                "REDIS_URL".to_string(),
                "cannot be empty".to_string(),
            ));
        }

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        // Sessions: 24h window. Earlier deployments ran 7 days; the TTL is
        // an operational knob, not a constant.
        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", 86_400)?;
        let cookie_secure = parse_env_or_default("COOKIE_SECURE", true)?;

        // Password hashing work factor
        let bcrypt_cost = parse_env_or_default("BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(BCRYPT_COST_MIN..=BCRYPT_COST_MAX).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidValue(
                "BCRYPT_COST".to_string(),
                format!(
                    "must be between {} and {}",
                    BCRYPT_COST_MIN, BCRYPT_COST_MAX
                ),
            ));
        }

        // CORS allow-list. Empty means no cross-origin callers.
        let allowed_origins_str = env::var("ALLOWED_ORIGINS").unwrap_or_default();
        let allowed_origins: Vec<String> = allowed_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Rate limiting
        let rate_limit_auth_per_min = parse_env_or_default("RATE_LIMIT_AUTH_PER_MIN", 5)?;

        Ok(Config {
            redis_url,
            bind_addr,
            session_ttl_secs,
            cookie_secure,
            bcrypt_cost,
            allowed_origins,
            rate_limit_auth_per_min,
        })
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
