//! Subscription status check types
//!
//! Wire payloads of `GET /subscriptions/check-status` and the classified
//! result every guard and observer works from.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::SubscriptionDetails;

/// Backend error code signalling that the session has no usable subscription.
pub const SUBSCRIPTION_REQUIRED_CODE: &str = "SUBSCRIPTION_REQUIRED";

/// Message used when the backend reports a missing subscription without one.
pub const DEFAULT_REQUIRED_MESSAGE: &str =
    "An active subscription is required to access this page.";

/// Message used when the status could not be determined.
pub const DEFAULT_ERROR_MESSAGE: &str =
    "We couldn't verify your subscription right now. Please try again shortly.";

/// Successful response body of the status check endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckStatusResponse {
    /// Whether the backend considers the session subscribed
    #[serde(default)]
    pub is_subscribed: bool,
    /// Subscription details, present when subscribed
    #[serde(default)]
    pub subscription: Option<SubscriptionDetails>,
    /// Optional explanation, usually present when not subscribed
    #[serde(default)]
    pub message: Option<String>,
}

impl CheckStatusResponse {
    /// Response for a subscribed session
    pub fn subscribed(subscription: SubscriptionDetails) -> Self {
        Self {
            is_subscribed: true,
            subscription: Some(subscription),
            message: None,
        }
    }

    /// Response for a session without a subscription
    pub fn unsubscribed(message: Option<String>) -> Self {
        Self {
            is_subscribed: false,
            subscription: None,
            message,
        }
    }
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Whether this body carries the subscription-required code
    pub fn is_subscription_required(&self) -> bool {
        self.code.as_deref() == Some(SUBSCRIPTION_REQUIRED_CODE)
    }
}

/// Closed set of classified entitlement states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusKind {
    /// Paid subscription
    Active,
    /// Free trial
    FreeTrialActive,
    /// No usable subscription
    SubscriptionRequired,
    /// Status could not be determined
    Error,
}

impl StatusKind {
    /// Whether this kind lets the session into gated views
    pub const fn is_entitled(&self) -> bool {
        matches!(self, Self::Active | Self::FreeTrialActive)
    }

    /// Get the wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::FreeTrialActive => "FREE_TRIAL_ACTIVE",
            Self::SubscriptionRequired => "SUBSCRIPTION_REQUIRED",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classified outcome, discriminated by kind.
///
/// Entitled variants carry the subscription, the others carry a message, so a
/// result can never hold both or neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusOutcome {
    /// Paid subscription
    Active {
        /// Subscription details
        subscription: SubscriptionDetails,
    },
    /// Free trial
    FreeTrialActive {
        /// Subscription details
        subscription: SubscriptionDetails,
    },
    /// No usable subscription
    SubscriptionRequired {
        /// Explanation shown to the user
        message: String,
    },
    /// Status could not be determined
    Error {
        /// Explanation shown to the user
        message: String,
    },
}

impl StatusOutcome {
    /// Get the kind of this outcome
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::Active { .. } => StatusKind::Active,
            Self::FreeTrialActive { .. } => StatusKind::FreeTrialActive,
            Self::SubscriptionRequired { .. } => StatusKind::SubscriptionRequired,
            Self::Error { .. } => StatusKind::Error,
        }
    }

    /// Outcome for a missing subscription
    pub fn required(message: impl Into<String>) -> Self {
        Self::SubscriptionRequired {
            message: message.into(),
        }
    }

    /// Outcome for an undeterminable status
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Classified result of one status fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResult {
    /// Classified outcome
    #[serde(flatten)]
    pub outcome: StatusOutcome,
    /// When the fetch that produced this result completed
    pub fetched_at: DateTime<Utc>,
}

impl SubscriptionStatusResult {
    /// Create a new result
    pub fn new(outcome: StatusOutcome, fetched_at: DateTime<Utc>) -> Self {
        Self {
            outcome,
            fetched_at,
        }
    }

    /// Get the classified kind
    pub fn kind(&self) -> StatusKind {
        self.outcome.kind()
    }

    /// Whether the session may enter gated views
    pub fn is_entitled(&self) -> bool {
        self.kind().is_entitled()
    }

    /// Subscription details, present for entitled kinds
    pub fn subscription(&self) -> Option<&SubscriptionDetails> {
        match &self.outcome {
            StatusOutcome::Active { subscription }
            | StatusOutcome::FreeTrialActive { subscription } => Some(subscription),
            StatusOutcome::SubscriptionRequired { .. } | StatusOutcome::Error { .. } => None,
        }
    }

    /// Message, present for non-entitled kinds
    pub fn message(&self) -> Option<&str> {
        match &self.outcome {
            StatusOutcome::SubscriptionRequired { message } | StatusOutcome::Error { message } => {
                Some(message)
            }
            StatusOutcome::Active { .. } | StatusOutcome::FreeTrialActive { .. } => None,
        }
    }

    /// Whether this result is still within `ttl` at `now`
    pub fn is_fresh(&self, ttl: std::time::Duration, now: DateTime<Utc>) -> bool {
        let ttl = Duration::from_std(ttl).unwrap_or(Duration::MAX);
        now.signed_duration_since(self.fetched_at) < ttl
    }
}
