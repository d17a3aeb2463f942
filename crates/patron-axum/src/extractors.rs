//! Axum extractors for subscription gating.
//!
//! These extractors read the [`SubscriptionContext`] the
//! [`SubscriptionLayer`](crate::SubscriptionLayer) attaches to requests.
//!
//! # Usage
//!
//! ```ignore
//! use patron_axum::{MaybeSubscription, RequireSubscription};
//!
//! // Requires an entitled session (402 or 503 otherwise)
//! async fn dashboard(sub: RequireSubscription) -> String {
//!     format!("Plan: {}", sub.subscription().map_or("-", |s| s.package_name.as_str()))
//! }
//!
//! // Works for everyone, richer for subscribers
//! async fn reports(sub: MaybeSubscription) -> String {
//!     match sub.0 {
//!         Some(ctx) if ctx.is_entitled() => "Full report".to_string(),
//!         _ => "Preview".to_string(),
//!     }
//! }
//! ```

use std::ops::Deref;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use patron_client::SessionToken;
use patron_types::{StatusKind, DEFAULT_REQUIRED_MESSAGE};

use crate::context::{extract_session, SessionCookie, SubscriptionContext};
use crate::error::EntitlementError;

/// Extractor that requires an entitled session.
///
/// Returns 402 Payment Required when the session has no subscription and
/// 503 Service Unavailable when its status could not be determined.
#[derive(Debug, Clone)]
pub struct RequireSubscription(pub SubscriptionContext);

impl Deref for RequireSubscription {
    type Target = SubscriptionContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl RequireSubscription {
    /// Check a context for entitlement.
    pub fn new(context: SubscriptionContext) -> Result<Self, EntitlementError> {
        match context.kind() {
            StatusKind::Active | StatusKind::FreeTrialActive => Ok(Self(context)),
            StatusKind::SubscriptionRequired => Err(EntitlementError::subscription_required(
                context.status.message().unwrap_or(DEFAULT_REQUIRED_MESSAGE),
            )),
            StatusKind::Error => Err(EntitlementError::Unavailable),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireSubscription
where
    S: Send + Sync,
{
    type Rejection = EntitlementError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts
            .extensions
            .get::<SubscriptionContext>()
            .cloned()
            .ok_or_else(|| EntitlementError::subscription_required(DEFAULT_REQUIRED_MESSAGE))?;

        Self::new(context)
    }
}

/// Extractor for an optional subscription context.
///
/// Returns `None` if the layer attached nothing, rather than failing.
#[derive(Debug, Clone)]
pub struct MaybeSubscription(pub Option<SubscriptionContext>);

impl Deref for MaybeSubscription {
    type Target = Option<SubscriptionContext>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSubscription
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<SubscriptionContext>().cloned()))
    }
}

/// Extractor for the session token, from the bearer header or the session
/// cookie named by the request's [`SessionCookie`].
///
/// Returns 401 Unauthorized if the request carries no session.
#[derive(Debug, Clone)]
pub struct RequireSession(pub SessionToken);

impl Deref for RequireSession {
    type Target = SessionToken;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = EntitlementError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_session(&parts.headers, SessionCookie::name_in(&parts.extensions))
            .map(|(token, _)| Self(token))
            .ok_or(EntitlementError::MissingSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionSource;
    use chrono::Utc;
    use patron_types::{
        GuardState, StatusOutcome, SubscriptionDetails, SubscriptionStatus,
        SubscriptionStatusResult,
    };
    use std::sync::Arc;

    fn make_context(outcome: StatusOutcome) -> SubscriptionContext {
        SubscriptionContext {
            session: SessionToken::new("token").key(),
            source: SessionSource::BearerToken,
            status: Arc::new(SubscriptionStatusResult::new(outcome, Utc::now())),
            state: GuardState::Allowed { degraded: false },
        }
    }

    #[test]
    fn test_require_subscription_success() {
        let ctx = make_context(StatusOutcome::FreeTrialActive {
            subscription: SubscriptionDetails::new("Pro", SubscriptionStatus::FreeTrial),
        });
        let sub = RequireSubscription::new(ctx).unwrap();
        assert_eq!(sub.subscription().unwrap().package_name, "Pro");
    }

    #[test]
    fn test_require_subscription_required() {
        let ctx = make_context(StatusOutcome::required("Pick a plan"));
        let result = RequireSubscription::new(ctx);
        assert!(matches!(
            result,
            Err(EntitlementError::SubscriptionRequired { ref message }) if message == "Pick a plan"
        ));
    }

    #[test]
    fn test_require_subscription_unavailable() {
        let ctx = make_context(StatusOutcome::error("down"));
        assert!(matches!(
            RequireSubscription::new(ctx),
            Err(EntitlementError::Unavailable)
        ));
    }
}
