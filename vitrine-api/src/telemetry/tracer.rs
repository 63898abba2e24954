//! Tracing Subscriber Initialization
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either
//! a JSON or a human-readable `fmt` layer.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{ApiError, ApiResult};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "vitrine_api=debug,vitrine_storage=debug,tower_http=debug,info";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Emit one JSON object per event instead of pretty text
    pub log_json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "vitrine-api".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_json: true,
        }
    }
}

impl TelemetryConfig {
    /// Environment variables:
    /// - `VITRINE_SERVICE_NAME` (default: vitrine-api)
    /// - `VITRINE_SERVICE_VERSION` (default: crate version)
    /// - `VITRINE_LOG_JSON`: "false" or "0" switches to text output (default: JSON)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: std::env::var("VITRINE_SERVICE_NAME").unwrap_or(defaults.service_name),
            service_version: std::env::var("VITRINE_SERVICE_VERSION")
                .unwrap_or(defaults.service_version),
            log_json: std::env::var("VITRINE_LOG_JSON")
                .map(|s| !matches!(s.to_lowercase().as_str(), "false" | "0"))
                .unwrap_or(defaults.log_json),
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup before any events are emitted. A second call fails.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = if config.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        service_version = %config.service_version,
        log_json = config.log_json,
        "Telemetry initialized"
    );

    Ok(())
}
