//! API Configuration Module
//!
//! Configuration for CORS, request limits, the bind address and the cache and
//! service parameters. Everything is loaded from `KOST_*` environment
//! variables with defaults suitable for development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use kost_core::{CacheConfig, ConfigError, ServiceConfig};

const DEFAULT_PORT: u16 = 3000;

/// Top-level API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // Server
    // ========================================================================
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,

    /// Deployment environment name ("development", "production", ...).
    pub environment: String,

    /// Requests taking longer than this are answered with 408.
    pub request_timeout: Duration,

    /// Upper bound on requests processed concurrently.
    pub max_concurrent_requests: usize,

    /// Optional JSON file of availability records loaded at startup.
    pub seed_file: Option<PathBuf>,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Availability
    // ========================================================================
    pub cache: CacheConfig,
    pub service: ServiceConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            environment: "development".to_string(),
            request_timeout: Duration::from_secs(30),
            max_concurrent_requests: 1024,
            seed_file: None,
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            cache: CacheConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `KOST_API_BIND`: full socket address, wins over host/port
    /// - `KOST_API_HOST` / `KOST_API_PORT` (or `PORT`): default 0.0.0.0:3000
    /// - `KOST_ENVIRONMENT`: deployment environment (default: development)
    /// - `KOST_REQUEST_TIMEOUT_SECS`, `KOST_MAX_CONCURRENT_REQUESTS`
    /// - `KOST_SEED_FILE`: JSON array of availability records
    /// - `KOST_CORS_ORIGINS`, `KOST_CORS_ALLOW_CREDENTIALS`, `KOST_CORS_MAX_AGE_SECS`
    /// - `KOST_CACHE_CAPACITY`, `KOST_CACHE_TTL_SECS`, `KOST_CACHE_SHARDS`,
    ///   `KOST_SWEEP_INTERVAL_SECS`
    /// - `KOST_STORE_TIMEOUT_MS`, `KOST_STATS_TTL_SECS`, `KOST_MAX_BATCH_SIZE`
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        let bind_addr = resolve_bind_addr(&lookup).unwrap_or(defaults.bind_addr);

        let environment = lookup("KOST_ENVIRONMENT")
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.environment);

        let cors_origins = lookup("KOST_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = lookup("KOST_CORS_ALLOW_CREDENTIALS")
            .map(|s| s.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let mut cache = defaults.cache;
        if let Some(capacity) = parsed("KOST_CACHE_CAPACITY") {
            cache = cache.with_capacity(capacity as usize);
        }
        if let Some(secs) = parsed("KOST_CACHE_TTL_SECS") {
            cache = cache.with_entry_ttl(Duration::from_secs(secs));
        }
        if let Some(shards) = parsed("KOST_CACHE_SHARDS") {
            cache = cache.with_shard_count(shards as usize);
        }
        if let Some(secs) = parsed("KOST_SWEEP_INTERVAL_SECS") {
            cache = cache.with_sweep_interval(Duration::from_secs(secs));
        }

        let mut service = defaults.service;
        if let Some(ms) = parsed("KOST_STORE_TIMEOUT_MS") {
            service = service.with_store_timeout(Duration::from_millis(ms));
        }
        if let Some(secs) = parsed("KOST_STATS_TTL_SECS") {
            service = service.with_stats_ttl(Duration::from_secs(secs));
        }
        if let Some(size) = parsed("KOST_MAX_BATCH_SIZE") {
            service = service.with_max_batch_size(size as usize);
        }

        Self {
            bind_addr,
            environment,
            request_timeout: parsed("KOST_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_concurrent_requests: parsed("KOST_MAX_CONCURRENT_REQUESTS")
                .map(|n| n as usize)
                .unwrap_or(defaults.max_concurrent_requests),
            seed_file: lookup("KOST_SEED_FILE")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs: parsed("KOST_CORS_MAX_AGE_SECS").unwrap_or(defaults.cors_max_age_secs),
            cache,
            service,
        }
    }

    /// Check every nested section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent_requests".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout".to_string(),
                value: "0s".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        self.cache.validate()?;
        self.service.validate()
    }

    /// Check if running in a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.kost.dev
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern));
                }
            }
            false
        })
    }
}

fn resolve_bind_addr(lookup: &impl Fn(&str) -> Option<String>) -> Option<SocketAddr> {
    if let Some(addr) = lookup("KOST_API_BIND").and_then(|s| SocketAddr::from_str(s.trim()).ok()) {
        return Some(addr);
    }

    let host = lookup("KOST_API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port = lookup("KOST_API_PORT")
        .or_else(|| lookup("PORT"))
        .and_then(|s| s.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    format!("{}:{}", host.trim(), port).parse().ok()
}
