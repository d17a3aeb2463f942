//! Subscription types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Package identifier assigned by the billing backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(pub String);

impl PackageId {
    /// Create a new package ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PackageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Subscription status as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Paid subscription in good standing
    Active,
    /// Free trial period
    FreeTrial,
    /// Payment is past due
    PastDue,
    /// Subscription was canceled
    Canceled,
    /// Billing period ended without renewal
    Expired,
    /// Status value this client does not know about
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Whether this status grants access to gated views
    pub const fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::FreeTrial)
    }

    /// Get the wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::FreeTrial => "FREE_TRIAL",
            Self::PastDue => "PAST_DUE",
            Self::Canceled => "CANCELED",
            Self::Expired => "EXPIRED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subscription held by the current session's organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDetails {
    /// Package the subscription was bought for
    #[serde(default)]
    pub package_id: Option<PackageId>,
    /// Display name of the package
    pub package_name: String,
    /// Plan name (monthly, yearly, ...)
    #[serde(default)]
    pub plan_name: Option<String>,
    /// Subscription status; older backends omit it for paid subscriptions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,
    /// Start of the subscription
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// End of the current billing period
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Next scheduled charge
    #[serde(default)]
    pub next_billing_date: Option<DateTime<Utc>>,
}

impl SubscriptionDetails {
    /// Create details with only the fields the gate needs
    pub fn new(package_name: impl Into<String>, status: SubscriptionStatus) -> Self {
        Self::named(package_name).with_status(status)
    }

    /// Create details that carry no status
    pub fn named(package_name: impl Into<String>) -> Self {
        Self {
            package_id: None,
            package_name: package_name.into(),
            plan_name: None,
            status: None,
            start_date: None,
            end_date: None,
            next_billing_date: None,
        }
    }

    /// Set the status
    #[must_use]
    pub fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the package ID
    #[must_use]
    pub fn with_package_id(mut self, id: impl Into<PackageId>) -> Self {
        self.package_id = Some(id.into());
        self
    }

    /// Set the plan name
    #[must_use]
    pub fn with_plan_name(mut self, plan: impl Into<String>) -> Self {
        self.plan_name = Some(plan.into());
        self
    }

    /// Whether the subscription is in its free trial
    pub fn is_trial(&self) -> bool {
        self.status == Some(SubscriptionStatus::FreeTrial)
    }
}

impl From<String> for PackageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
