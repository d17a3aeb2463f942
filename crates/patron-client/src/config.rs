//! Client configuration

use std::str::FromStr;
use std::time::Duration;

/// Default per-request timeout for status checks.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_url: String,
    request_timeout: Duration,
    connect_timeout: Duration,
    user_agent: String,
}

impl ClientConfig {
    /// Create a configuration builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    ///
    /// `PATRON_API_URL` is required; `PATRON_REQUEST_TIMEOUT_SECS` is optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url =
            std::env::var("PATRON_API_URL").map_err(|_| ConfigError::Missing("PATRON_API_URL"))?;

        let mut builder = Self::builder().api_url(api_url);

        if let Some(secs) = env_parse::<u64>("PATRON_REQUEST_TIMEOUT_SECS")? {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Base URL of the backend API, without trailing slash
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// User agent sent with every request
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Full URL of the status check endpoint
    pub fn check_status_url(&self) -> String {
        format!("{}/subscriptions/check-status", self.api_url)
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    api_url: Option<String>,
    request_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientConfigBuilder {
    /// Set the backend base URL
    #[must_use]
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the connect timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let api_url = self.api_url.ok_or(ConfigError::Missing("api_url"))?;
        let api_url = api_url.trim_end_matches('/').to_string();

        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid("api_url"));
        }

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        if request_timeout.is_zero() {
            return Err(ConfigError::Invalid("request_timeout"));
        }

        Ok(ClientConfig {
            api_url,
            request_timeout,
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| format!("patron-client/{}", env!("CARGO_PKG_VERSION"))),
        })
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required value was not set, e.g. `PATRON_API_URL`.
    #[error("missing required configuration value: {0}")]
    Missing(&'static str),

    /// A value was set but could not be parsed or is out of range.
    #[error("invalid value for configuration value: {0}")]
    Invalid(&'static str),
}

/// Parse an optional environment variable.
pub(crate) fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}
