//! Tracing Subscriber Initialization
//!
//! Structured logs go to stdout, as JSON for log shippers or as compact
//! lines for local development. Filtering follows `RUST_LOG`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "kost_api=debug,kost_storage=info,tower_http=debug,info";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Compact,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "compact" | "text" | "pretty" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (production, staging, development)
    pub environment: String,
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

impl TelemetryConfig {
    /// Build from an arbitrary variable source.
    ///
    /// # Environment Variables
    /// - `KOST_SERVICE_NAME` (default `kost-api`)
    /// - `KOST_ENVIRONMENT` (default `development`)
    /// - `KOST_LOG_FORMAT`: `json` or `compact`. Defaults to compact in
    ///   development and JSON elsewhere.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = lookup("KOST_ENVIRONMENT").unwrap_or_else(|| "development".to_string());
        let log_format = lookup("KOST_LOG_FORMAT")
            .and_then(|raw| LogFormat::parse(&raw))
            .unwrap_or(if environment == "development" {
                LogFormat::Compact
            } else {
                LogFormat::Json
            });

        Self {
            service_name: lookup("KOST_SERVICE_NAME").unwrap_or_else(|| "kost-api".to_string()),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment,
            log_format,
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup. A second call fails because a global subscriber is
/// already set.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    };
    installed.map_err(|e| ApiError::internal_error(format!("Failed to set tracing subscriber: {}", e)))?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = %config.environment,
        format = ?config.log_format,
        "Telemetry initialized"
    );
    Ok(())
}
