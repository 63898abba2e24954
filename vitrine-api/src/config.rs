//! API Configuration Module
//!
//! CORS, bind address and request timeout settings. Configuration is loaded
//! from environment variables with defaults suited to development.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP surface configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    /// Example: "https://clinica.example,https://admin.clinica.example"
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Server Configuration
    // ========================================================================
    pub bind_host: String,

    /// Raw port string, validated by [`ApiConfig::bind_addr`].
    pub port: String,

    /// Requests running longer than this are aborted with 504.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            bind_host: "0.0.0.0".to_string(),
            port: "3000".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `VITRINE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `VITRINE_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `VITRINE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `VITRINE_API_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT` or `VITRINE_API_PORT`: Listen port (default: 3000)
    /// - `VITRINE_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = std::env::var("VITRINE_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("VITRINE_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("VITRINE_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let bind_host = std::env::var("VITRINE_API_BIND").unwrap_or(defaults.bind_host);

        let port = std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("VITRINE_API_PORT").ok())
            .unwrap_or(defaults.port);

        let request_timeout = std::env::var("VITRINE_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            bind_host,
            port,
            request_timeout,
        }
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Resolve the socket address to listen on.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let port = self
            .port
            .parse::<u16>()
            .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", self.port)))?;

        let addr = format!("{}:{}", self.bind_host, port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }
}
