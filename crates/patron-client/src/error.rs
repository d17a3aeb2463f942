//! Client errors
//!
//! Error types for Patron client operations, with mapping from HTTP statuses
//! and `reqwest` transport failures.

use reqwest::StatusCode;
use thiserror::Error;

use crate::classify::ClassificationError;

/// Result type for Patron client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors for Patron operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection error - failed to reach the backend.
    #[error("connection error: {message}")]
    Connection {
        /// Error message
        message: String,
        /// Whether the error is retryable
        retryable: bool,
    },

    /// Request timeout.
    #[error("request timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Backend reported that the session has no usable subscription.
    ///
    /// This is an expected business state; the entitlement cache turns it into
    /// data rather than surfacing it.
    #[error("subscription required: {}", .message.as_deref().unwrap_or("no message"))]
    SubscriptionRequired {
        /// Message supplied by the backend
        message: Option<String>,
    },

    /// Authentication required - session missing or expired (401).
    #[error("authentication required: {0}")]
    Unauthenticated(String),

    /// Permission denied (403).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (429).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Other client-side HTTP failure (4xx).
    #[error("request rejected with {status}: {message}")]
    Rejected {
        /// HTTP status
        status: StatusCode,
        /// Response message
        message: String,
    },

    /// Server-side HTTP failure (5xx).
    #[error("server error {status}: {message}")]
    Server {
        /// HTTP status
        status: StatusCode,
        /// Response message
        message: String,
    },

    /// Response body could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Payload shape the classifier does not accept.
    #[error("classification error: {0}")]
    Classification(#[from] ClassificationError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl ClientError {
    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { retryable, .. } => *retryable,
            Self::Timeout(_) => true,
            Self::Server { .. } => true,
            Self::RateLimited(_) => true, // Retryable with backoff
            Self::SubscriptionRequired { .. } => false, // Business state, not a failure
            Self::Unauthenticated(_) => false, // Need new credentials
            Self::PermissionDenied(_) => false,
            Self::NotFound(_) => false,
            Self::Rejected { .. } => false,
            Self::Serialization(_) => false,
            Self::Classification(_) => false,
            Self::Config(_) => false,
        }
    }

    /// Returns the HTTP status this error originated from, if any.
    #[must_use]
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthenticated(_) => Some(StatusCode::UNAUTHORIZED),
            Self::PermissionDenied(_) => Some(StatusCode::FORBIDDEN),
            Self::NotFound(_) => Some(StatusCode::NOT_FOUND),
            Self::RateLimited(_) => Some(StatusCode::TOO_MANY_REQUESTS),
            Self::Rejected { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Timeout(_) => Some(StatusCode::GATEWAY_TIMEOUT),
            Self::Connection { .. }
            | Self::SubscriptionRequired { .. }
            | Self::Serialization(_)
            | Self::Classification(_)
            | Self::Config(_) => None,
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>, retryable: bool) -> Self {
        Self::Connection {
            message: message.into(),
            retryable,
        }
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();

        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthenticated(message),
            StatusCode::FORBIDDEN => Self::PermissionDenied(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited(message),
            StatusCode::REQUEST_TIMEOUT => Self::Timeout(std::time::Duration::from_secs(0)),
            s if s.is_server_error() => Self::Server { status, message },
            _ => Self::Rejected { status, message },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(std::time::Duration::from_secs(0))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else if err.is_builder() {
            Self::connection(err.to_string(), false)
        } else {
            Self::Connection {
                message: err.to_string(),
                retryable: true, // Transport errors are typically transient
            }
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
