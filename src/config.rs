//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible
//! defaults for development. In production, configure via environment
//! variables or a `.env` file.
//!
//! # Rate Limiting
//!
//! - `IP_LIMIT_PER_WINDOW` / `TOKEN_LIMIT_PER_WINDOW`: per-class request
//!   ceilings (0 = unlimited for that class)
//! - `IP_LOCKOUT_DURATION_SECS` / `TOKEN_LOCKOUT_DURATION_SECS`: how long a
//!   key stays denied after crossing its ceiling
//! - `RATE_LIMIT_WINDOW_MS`: the fixed counting window (default: 1000)
//! - `RATE_LIMIT_FAIL_OPEN`: forward requests when the store is down instead
//!   of failing closed (default: false)
//!
//! # Store Configuration
//!
//! - `RATE_LIMIT_BACKEND`: `memory` or `redis` (default: memory)
//! - `REDIS_URL`: connection URL for the redis backend
//! - `STORE_TIMEOUT_MS`: bound on every store round-trip (default: 1000)

use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::limiter::{ClassPolicy, LimitPolicy};

/// Which counting store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store; single-instance deployments and tests.
    Memory,
    /// Redis-backed store; shared across serving processes.
    Redis,
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Fixed counting window length (default: 1 second)
    pub window: Duration,

    /// Requests per window for IP-based keys; 0 = unlimited (default: 10)
    pub ip_limit_per_window: u32,

    /// Requests per window for token-based keys; 0 = unlimited (default: 100)
    pub token_limit_per_window: u32,

    /// Lockout duration for IP-based keys after crossing the ceiling
    pub ip_lockout_duration: Duration,

    /// Lockout duration for token-based keys after crossing the ceiling
    pub token_lockout_duration: Duration,

    /// Header carrying the opaque token credential (default: "token")
    pub token_header: String,

    /// Forward requests when the limiter cannot reach its store, instead of
    /// responding with a server error. Fail-closed is the default so that
    /// protection is never silently disabled.
    pub fail_open: bool,

    // =========================================================================
    // Counting Store Configuration
    // =========================================================================
    /// Which store backend to use (default: memory)
    pub store_backend: StoreBackend,

    /// Redis connection URL, used when the backend is `redis`
    pub redis_url: String,

    /// Bound on every store round-trip; elapsed = store failure
    pub store_timeout: Duration,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value is invalid (e.g.
    /// non-numeric `PORT`, unknown backend name, zero window).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,

            // Rate limiting
            window: Duration::from_millis(Self::parse_env("RATE_LIMIT_WINDOW_MS", 1000)?),
            ip_limit_per_window: Self::parse_env("IP_LIMIT_PER_WINDOW", 10)?,
            token_limit_per_window: Self::parse_env("TOKEN_LIMIT_PER_WINDOW", 100)?,
            ip_lockout_duration: Duration::from_secs(Self::parse_env(
                "IP_LOCKOUT_DURATION_SECS",
                60,
            )?),
            token_lockout_duration: Duration::from_secs(Self::parse_env(
                "TOKEN_LOCKOUT_DURATION_SECS",
                300,
            )?),
            token_header: env::var("TOKEN_HEADER").unwrap_or_else(|_| "token".to_string()),
            fail_open: Self::parse_env("RATE_LIMIT_FAIL_OPEN", false)?,

            // Counting store
            store_backend: Self::parse_backend()?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string()),
            store_timeout: Duration::from_millis(Self::parse_env("STORE_TIMEOUT_MS", 1000)?),

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// A ceiling of 0 is valid ("unlimited"); negative ceilings are
    /// unrepresentable. Fails fast so the process never serves traffic with
    /// a broken policy.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        if self.window.is_zero() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_WINDOW_MS must be greater than 0".to_string(),
            ));
        }

        if self.store_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "STORE_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        if self.token_header.trim().is_empty() {
            return Err(AppError::ConfigError(
                "TOKEN_HEADER must not be empty".to_string(),
            ));
        }

        if self.store_backend == StoreBackend::Redis && self.redis_url.trim().is_empty() {
            return Err(AppError::ConfigError(
                "REDIS_URL must be set when RATE_LIMIT_BACKEND=redis".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the immutable limit policy from the per-class settings.
    pub fn limit_policy(&self) -> LimitPolicy {
        LimitPolicy::new(
            self.window,
            ClassPolicy {
                max_requests: self.token_limit_per_window,
                lockout: self.token_lockout_duration,
            },
            ClassPolicy {
                max_requests: self.ip_limit_per_window,
                lockout: self.ip_lockout_duration,
            },
        )
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr + ToString,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse the store backend name, normalized to lowercase.
    fn parse_backend() -> AppResult<StoreBackend> {
        match env::var("RATE_LIMIT_BACKEND") {
            Ok(val) => match val.trim().to_lowercase().as_str() {
                "memory" => Ok(StoreBackend::Memory),
                "redis" => Ok(StoreBackend::Redis),
                other => Err(AppError::ConfigError(format!(
                    "Invalid RATE_LIMIT_BACKEND '{other}': expected 'memory' or 'redis'"
                ))),
            },
            Err(_) => Ok(StoreBackend::Memory),
        }
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            // Rate limiting
            window: Duration::from_secs(1),
            ip_limit_per_window: 10,
            token_limit_per_window: 100,
            ip_lockout_duration: Duration::from_secs(60),
            token_lockout_duration: Duration::from_secs(300),
            token_header: "token".to_string(),
            fail_open: false,
            // Counting store
            store_backend: StoreBackend::Memory,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            store_timeout: Duration::from_secs(1),
            // Observability
            log_level: "info".to_string(),
        }
    }
}
