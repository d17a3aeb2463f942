//! Entitlement classification
//!
//! Maps what the status source produced into the closed set of
//! [`StatusOutcome`]s. Rules, in priority order:
//!
//! 1. Backend error code `SUBSCRIPTION_REQUIRED` → subscription required.
//! 2. Transport failed after retries → error.
//! 3. Subscribed payload with an active or trial subscription → active / trial.
//!    A subscription without a status counts as active.
//! 4. Any other well-formed payload → subscription required.
//!
//! Shapes that fit none of these are [`ClassificationError`]s.

use chrono::{DateTime, Utc};
use patron_types::{
    CheckStatusResponse, ErrorBody, StatusOutcome, SubscriptionDetails, SubscriptionStatus,
    SubscriptionStatusResult, DEFAULT_ERROR_MESSAGE, DEFAULT_REQUIRED_MESSAGE,
};
use thiserror::Error;

/// What the status source produced, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RawStatus {
    /// 2xx response body
    Payload(CheckStatusResponse),
    /// Non-2xx response with a business error body
    Rejected(ErrorBody),
    /// No usable answer after retries
    TransportFailed {
        /// Description of the last failure
        message: String,
    },
}

/// Payload shape the classifier refuses to interpret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    /// `isSubscribed` is true but no subscription was sent.
    #[error("payload reports a subscription but carries no subscription details")]
    MissingSubscription,

    /// `isSubscribed` is false but the subscription grants access.
    #[error("payload reports no subscription but carries a {status} subscription")]
    ContradictoryPayload {
        /// Status of the unexpected subscription
        status: SubscriptionStatus,
    },

    /// Rejection with a code other than `SUBSCRIPTION_REQUIRED`.
    #[error("unexpected rejection code: {}", .code.as_deref().unwrap_or("<none>"))]
    UnexpectedRejection {
        /// Code from the error body
        code: Option<String>,
    },
}

/// What to do with a [`ClassificationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationPolicy {
    /// Surface the error to the caller.
    Strict,
    /// Log it and report an `ERROR` result.
    Degrade,
}

impl Default for ClassificationPolicy {
    /// Strict in debug builds, degrading in release builds.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Degrade
        }
    }
}

/// Classify a raw status into an outcome.
pub fn classify_outcome(raw: RawStatus) -> Result<StatusOutcome, ClassificationError> {
    match raw {
        RawStatus::Rejected(body) if body.is_subscription_required() => {
            Ok(StatusOutcome::required(non_empty_or(
                body.message,
                DEFAULT_REQUIRED_MESSAGE,
            )))
        }
        RawStatus::Rejected(body) => Err(ClassificationError::UnexpectedRejection { code: body.code }),
        RawStatus::TransportFailed { message } => {
            Ok(StatusOutcome::error(non_empty_or(Some(message), DEFAULT_ERROR_MESSAGE)))
        }
        RawStatus::Payload(payload) => classify_payload(payload),
    }
}

/// Classify a raw status and stamp it with `fetched_at`.
pub fn classify(
    raw: RawStatus,
    fetched_at: DateTime<Utc>,
) -> Result<SubscriptionStatusResult, ClassificationError> {
    classify_outcome(raw).map(|outcome| SubscriptionStatusResult::new(outcome, fetched_at))
}

fn classify_payload(payload: CheckStatusResponse) -> Result<StatusOutcome, ClassificationError> {
    let CheckStatusResponse {
        is_subscribed,
        subscription,
        message,
    } = payload;

    match (is_subscribed, subscription) {
        (true, None) => Err(ClassificationError::MissingSubscription),
        // A subscribed payload without a status is a paid subscription
        (true, Some(subscription)) => Ok(match subscription.status {
            None | Some(SubscriptionStatus::Active) => StatusOutcome::Active { subscription },
            Some(SubscriptionStatus::FreeTrial) => StatusOutcome::FreeTrialActive { subscription },
            Some(_) => StatusOutcome::required(non_empty_or(message, DEFAULT_REQUIRED_MESSAGE)),
        }),
        (false, Some(SubscriptionDetails { status: Some(status), .. })) if status.grants_access() => {
            Err(ClassificationError::ContradictoryPayload { status })
        }
        (false, _) => Ok(StatusOutcome::required(non_empty_or(
            message,
            DEFAULT_REQUIRED_MESSAGE,
        ))),
    }
}

fn non_empty_or(message: Option<String>, default: &str) -> String {
    match message {
        Some(m) if !m.trim().is_empty() => m,
        _ => default.to_string(),
    }
}
