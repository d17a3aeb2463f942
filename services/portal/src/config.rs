//! Configuration for the portal service.

use std::time::Duration;

use patron_client::{CacheConfig, ClientConfig};

/// Portal configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Patron API client configuration
    pub client: ClientConfig,
    /// Entitlement cache configuration
    pub cache: CacheConfig,
    /// Request timeout for page handlers
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        let client = ClientConfig::from_env()?;
        let cache = CacheConfig::from_env()?;

        // Leave room for the status check and all of its retries
        let request_timeout =
            Duration::from_secs(30).max(client.request_timeout() * 2 + cache.retry.max_total_backoff());

        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Self {
            http_port,
            client,
            cache,
            request_timeout,
            metrics_enabled,
        })
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error(transparent)]
    Client(#[from] patron_client::ConfigError),
}
