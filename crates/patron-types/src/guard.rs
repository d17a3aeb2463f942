//! Route guard types

use serde::{Deserialize, Serialize};

/// Per-view guard configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardConfig {
    /// Redirect to the pricing page when entitlement is missing or unknown.
    /// When false the guard fails open.
    pub redirect_on_missing: bool,
    /// Render a loading placeholder while the status is being checked.
    pub show_loader: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            redirect_on_missing: true,
            show_loader: true,
        }
    }
}

impl GuardConfig {
    /// Strict guard: redirects when entitlement is missing
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }

    /// Lenient guard: never blocks, even when entitlement is missing
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            redirect_on_missing: false,
            ..Self::default()
        }
    }

    /// Set whether to redirect on missing entitlement
    #[must_use]
    pub fn redirect_on_missing(mut self, redirect: bool) -> Self {
        self.redirect_on_missing = redirect;
        self
    }

    /// Set whether to show a loader while checking
    #[must_use]
    pub fn show_loader(mut self, show: bool) -> Self {
        self.show_loader = show;
        self
    }
}

/// Derived guard decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardDecision {
    /// The guard is still waiting for a status and wants a loader shown
    pub is_loading: bool,
    /// The guard has decided to send the user to the pricing page
    pub should_redirect: bool,
}

/// Guard state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardState {
    /// Waiting for a classified status
    Checking,
    /// Protected content may render
    Allowed {
        /// Allowed only because the guard fails open
        degraded: bool,
    },
    /// Navigation to the pricing page has been issued; terminal for the mount
    Redirecting,
}

impl GuardState {
    /// Whether protected content may render
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// What a guarded view should render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardView {
    /// The protected children
    Children,
    /// A loading indicator
    Loader,
    /// The caller's fallback, or nothing
    Placeholder,
}
