//! HTTP status source
//!
//! The entitlement cache reads subscription status through the
//! [`StatusSource`] trait. [`HttpStatusSource`] implements it over `reqwest`
//! against `GET /subscriptions/check-status`, attaching the session bearer
//! token and a request ID to every call.

use std::sync::Arc;

use async_trait::async_trait;
use patron_types::{CheckStatusResponse, ErrorBody};
use reqwest::Client;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::metrics::{CheckOutcome, CheckTimer};
use crate::{ClientConfig, ClientError, Result, SessionToken};

/// Header carrying the per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Source of raw subscription status for a session.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the status for `session` once, without retries.
    ///
    /// A backend `SUBSCRIPTION_REQUIRED` answer is reported as
    /// [`ClientError::SubscriptionRequired`].
    async fn check_status(&self, session: &SessionToken) -> Result<CheckStatusResponse>;
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for Arc<T> {
    async fn check_status(&self, session: &SessionToken) -> Result<CheckStatusResponse> {
        (**self).check_status(session).await
    }
}

/// Status source backed by the Patron REST API.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: Client,
    config: ClientConfig,
}

impl HttpStatusSource {
    /// Create a source with a client built from `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| ClientError::connection(format!("failed to build HTTP client: {e}"), false))?;

        Ok(Self { client, config })
    }

    /// Create a source with an existing client.
    pub fn with_client(config: ClientConfig, client: Client) -> Self {
        Self { client, config }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    #[instrument(skip(self, session), fields(session = %session.key()), level = "debug")]
    async fn check_status(&self, session: &SessionToken) -> Result<CheckStatusResponse> {
        let timer = CheckTimer::start();
        let request_id = Uuid::new_v4().to_string();

        let sent = self
            .client
            .get(self.config.check_status_url())
            .bearer_auth(session.expose())
            .header(REQUEST_ID_HEADER, &request_id)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                timer.finish(CheckOutcome::TimedOut);
                debug!(request_id = %request_id, "status check timed out");
                return Err(ClientError::Timeout(self.config.request_timeout()));
            }
            Err(e) => {
                timer.finish(CheckOutcome::Failed);
                debug!(request_id = %request_id, error = %e, "status check request failed");
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error_body: ErrorBody = serde_json::from_str(&body).unwrap_or_default();

            if error_body.is_subscription_required() {
                timer.finish(CheckOutcome::Required);
                debug!(request_id = %request_id, status = %status, "backend reports subscription required");
                return Err(ClientError::SubscriptionRequired {
                    message: error_body.message,
                });
            }

            timer.finish(CheckOutcome::Failed);
            let message = error_body.message.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("status check failed")
                    .to_string()
            });
            debug!(request_id = %request_id, status = %status, message = %message, "status check rejected");
            return Err(ClientError::from_status(status, message));
        }

        match response.json::<CheckStatusResponse>().await {
            Ok(payload) => {
                timer.finish(CheckOutcome::Answered);
                Ok(payload)
            }
            Err(e) => {
                timer.finish(CheckOutcome::Failed);
                debug!(request_id = %request_id, error = %e, "failed to decode status payload");
                Err(ClientError::Serialization(e.to_string()))
            }
        }
    }
}
