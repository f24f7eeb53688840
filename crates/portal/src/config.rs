//! Portal configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ACADEMY_API_URL` - Base URL of the academy API (e.g., <https://api.example.org>)
//!
//! ## Optional
//! - `TOUCHLINE_HOST` - Bind address (default: 127.0.0.1)
//! - `TOUCHLINE_PORT` - Listen port (default: 3000)
//! - `TOUCHLINE_BASE_URL` - Public URL for the portal (default: http://localhost:3000)
//! - `TOUCHLINE_STATE_DIR` - Directory for the durable session vault (default: ./data)
//! - `ACADEMY_API_TIMEOUT_SECS` - Per-request timeout for academy calls (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Portal application configuration.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the portal
    pub base_url: String,
    /// Base URL of the external academy API
    pub academy_api_url: Url,
    /// Per-request timeout for academy API calls
    pub academy_api_timeout: Duration,
    /// Directory holding the durable session vault file
    pub state_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl PortalConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("TOUCHLINE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("TOUCHLINE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("TOUCHLINE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("TOUCHLINE_PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("TOUCHLINE_BASE_URL", "http://localhost:3000");

        let academy_api_url = Url::parse(&get_required_env("ACADEMY_API_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("ACADEMY_API_URL".to_string(), e.to_string()))?;
        let academy_api_timeout = get_env_or_default("ACADEMY_API_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ACADEMY_API_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        let state_dir = PathBuf::from(get_env_or_default("TOUCHLINE_STATE_DIR", "./data"));
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            base_url,
            academy_api_url,
            academy_api_timeout,
            state_dir,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
