//! Error types for the subscription layer and extractors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use patron_types::{ErrorBody, DEFAULT_ERROR_MESSAGE, SUBSCRIPTION_REQUIRED_CODE};

/// Entitlement errors returned to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum EntitlementError {
    /// No session on the request.
    #[error("session required")]
    MissingSession,

    /// The session has no usable subscription.
    #[error("subscription required: {message}")]
    SubscriptionRequired { message: String },

    /// The subscription status could not be determined.
    #[error("subscription status unavailable")]
    Unavailable,

    /// Patron client error.
    #[error("patron client error: {0}")]
    Client(#[from] patron_client::ClientError),
}

impl IntoResponse for EntitlementError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::MissingSession => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "session required".to_string(),
            ),
            Self::SubscriptionRequired { message } => {
                (StatusCode::PAYMENT_REQUIRED, SUBSCRIPTION_REQUIRED_CODE, message)
            }
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STATUS_UNAVAILABLE",
                DEFAULT_ERROR_MESSAGE.to_string(),
            ),
            Self::Client(e) => {
                tracing::error!(error = %e, "patron client error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STATUS_UNAVAILABLE",
                    DEFAULT_ERROR_MESSAGE.to_string(),
                )
            }
        };

        let body = ErrorBody {
            code: Some(code.to_string()),
            message: Some(message),
        };
        (status, Json(body)).into_response()
    }
}

impl EntitlementError {
    /// Create a subscription required error.
    #[must_use]
    pub fn subscription_required(message: impl Into<String>) -> Self {
        Self::SubscriptionRequired {
            message: message.into(),
        }
    }
}
