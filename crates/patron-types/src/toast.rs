//! Notification payload types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DASHBOARD_ROUTE, PRICING_ROUTE};

/// Visual variant of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    /// Attention-seeking alert
    Alert,
    /// Positive confirmation
    Success,
}

/// Link rendered inside a toast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastAction {
    /// Button label
    pub label: String,
    /// Route the button navigates to
    pub href: String,
}

/// User-visible, dismissible notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    /// Title line
    pub title: String,
    /// Body text
    pub description: String,
    /// Visual variant
    pub variant: ToastVariant,
    /// Auto-dismiss delay
    #[serde(rename = "durationMs", with = "duration_ms")]
    pub duration: Duration,
    /// Optional call to action
    pub action: Option<ToastAction>,
}

impl Toast {
    /// Alert shown when the session loses (or never had) a subscription.
    pub fn subscription_required(description: impl Into<String>) -> Self {
        Self {
            title: "Subscription required".to_string(),
            description: description.into(),
            variant: ToastVariant::Alert,
            duration: Duration::from_secs(10),
            action: Some(ToastAction {
                label: "View plans".to_string(),
                href: PRICING_ROUTE.to_string(),
            }),
        }
    }

    /// Confirmation shown when a subscription becomes active.
    pub fn subscription_active(package_name: &str) -> Self {
        Self {
            title: "Subscription active".to_string(),
            description: format!("Your {package_name} plan is now active."),
            variant: ToastVariant::Success,
            duration: Duration::from_secs(5),
            action: Some(ToastAction {
                label: "Go to dashboard".to_string(),
                href: DASHBOARD_ROUTE.to_string(),
            }),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
