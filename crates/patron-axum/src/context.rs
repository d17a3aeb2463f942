//! Subscription context types.
//!
//! The [`SubscriptionContext`] is attached to request extensions by the
//! [`SubscriptionLayer`](crate::SubscriptionLayer) for every request it lets
//! through with a known session.

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use patron_client::{SessionKey, SessionToken};
use patron_types::{GuardState, StatusKind, SubscriptionDetails, SubscriptionStatusResult};

/// Default name of the session cookie.
pub const SESSION_COOKIE: &str = "patron_session";

/// Session cookie name in effect for a request.
///
/// The [`SubscriptionLayer`](crate::SubscriptionLayer) inserts it into request
/// extensions. Routes outside the layer can add it with
/// `axum::Extension(SessionCookie::new("sid"))`. Without it,
/// [`SESSION_COOKIE`] is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie(pub String);

impl SessionCookie {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Cookie name for a request with these extensions.
    pub fn name_in(extensions: &axum::http::Extensions) -> &str {
        extensions
            .get::<Self>()
            .map_or(SESSION_COOKIE, |cookie| cookie.0.as_str())
    }
}

/// Where the session token was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// Bearer token from the Authorization header.
    BearerToken,
    /// Session cookie.
    Cookie,
}

/// Entitlement information for the current request.
#[derive(Debug, Clone)]
pub struct SubscriptionContext {
    /// Cache key of the session.
    pub session: SessionKey,
    /// Where the session came from.
    pub source: SessionSource,
    /// Classified status the guard decided on.
    pub status: Arc<SubscriptionStatusResult>,
    /// Guard state for this request.
    pub state: GuardState,
}

impl SubscriptionContext {
    /// Classified kind.
    pub fn kind(&self) -> StatusKind {
        self.status.kind()
    }

    /// Whether the session is entitled.
    pub fn is_entitled(&self) -> bool {
        self.status.is_entitled()
    }

    /// Whether the request was let through only because the guard fails open.
    pub fn is_degraded(&self) -> bool {
        matches!(self.state, GuardState::Allowed { degraded: true })
    }

    /// Subscription details, for entitled sessions.
    pub fn subscription(&self) -> Option<&SubscriptionDetails> {
        self.status.subscription()
    }
}

/// Read the session token from request headers.
///
/// The bearer token wins over the cookie.
pub fn extract_session(
    headers: &HeaderMap,
    cookie_name: &str,
) -> Option<(SessionToken, SessionSource)> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some((SessionToken::new(token), SessionSource::BearerToken));
                }
            }
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| (SessionToken::new(value), SessionSource::Cookie))
}
