//! Tower middleware layer for subscription gating.
//!
//! The [`SubscriptionLayer`] runs a [`RouteGuard`] for every request against
//! the shared entitlement cache. Requests the guard allows continue with a
//! [`SubscriptionContext`] in their extensions; requests it redirects get a
//! `303 See Other` to the pricing page.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Redirect, Response};
use futures::future::BoxFuture;
use patron_client::{EntitlementContext, RouteGuard, SharedEntitlementCache};
use patron_types::{GuardConfig, PRICING_ROUTE};
use tokio::sync::mpsc;
use tower::{Layer, Service};
use tracing::debug;

use crate::context::{extract_session, SessionCookie, SubscriptionContext, SESSION_COOKIE};
use crate::error::EntitlementError;

/// Tower layer that gates requests on the session's subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionLayer {
    cache: SharedEntitlementCache,
    guard: GuardConfig,
    cookie_name: String,
}

impl SubscriptionLayer {
    /// Create a new layer over a shared cache.
    #[must_use]
    pub fn new(cache: SharedEntitlementCache, guard: GuardConfig) -> Self {
        Self {
            cache,
            guard,
            cookie_name: SESSION_COOKIE.to_string(),
        }
    }

    /// Set the session cookie name.
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }
}

impl<S> Layer<S> for SubscriptionLayer {
    type Service = SubscriptionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SubscriptionService {
            inner,
            cache: self.cache.clone(),
            guard: self.guard,
            cookie_name: self.cookie_name.clone(),
        }
    }
}

/// The subscription gating service.
#[derive(Debug, Clone)]
pub struct SubscriptionService<S> {
    inner: S,
    cache: SharedEntitlementCache,
    guard: GuardConfig,
    cookie_name: String,
}

impl<S> Service<Request<Body>> for SubscriptionService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let session = extract_session(req.headers(), &self.cookie_name);
        req.extensions_mut()
            .insert(SessionCookie::new(self.cookie_name.clone()));
        let cache = self.cache.clone();
        let config = self.guard;

        // Take the service that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let Some((token, source)) = session else {
                if config.redirect_on_missing {
                    debug!(path = %req.uri().path(), "no session, redirecting");
                    return Ok(Redirect::to(PRICING_ROUTE).into_response());
                }
                return inner.call(req).await;
            };

            let ctx = EntitlementContext::new(cache, token);
            let (navigator, mut navigations) = mpsc::unbounded_channel();
            let mut guard = RouteGuard::new(config, navigator);

            let state = match guard.check(&ctx).await {
                Ok(state) => state,
                Err(e) => return Ok(EntitlementError::from(e).into_response()),
            };

            if let Ok(route) = navigations.try_recv() {
                return Ok(Redirect::to(&route).into_response());
            }

            if let Some(status) = ctx.current() {
                req.extensions_mut().insert(SubscriptionContext {
                    session: ctx.session().key(),
                    source,
                    status,
                    state,
                });
            }

            inner.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use patron_client::{CacheConfig, EntitlementCache, SessionToken, StatusSource};
    use patron_types::CheckStatusResponse;
    use std::sync::Arc;

    struct Unsubscribed;

    #[async_trait]
    impl StatusSource for Unsubscribed {
        async fn check_status(
            &self,
            _session: &SessionToken,
        ) -> patron_client::Result<CheckStatusResponse> {
            Ok(CheckStatusResponse::unsubscribed(None))
        }
    }

    #[test]
    fn test_layer_builder() {
        let cache = Arc::new(EntitlementCache::new(Unsubscribed, CacheConfig::default()));
        let layer =
            SubscriptionLayer::new(cache, GuardConfig::lenient()).with_cookie_name("sid");

        assert_eq!(layer.cookie_name, "sid");
        assert!(!layer.guard.redirect_on_missing);
    }
}
