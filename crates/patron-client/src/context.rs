//! Per-session entitlement context
//!
//! Binds a session to the shared [`EntitlementCache`] and publishes every
//! settled result on a `watch` channel. Guards read through the context and
//! the notification observer subscribes to it.

use std::sync::Arc;

use chrono::Utc;
use patron_types::SubscriptionStatusResult;
use tokio::sync::watch;
use tracing::debug;

use crate::cache::SharedEntitlementCache;
use crate::{Result, SessionToken};

/// Receiver of published entitlement results.
pub type StatusReceiver = watch::Receiver<Option<Arc<SubscriptionStatusResult>>>;

/// Entitlement state for one session.
///
/// Results are published whole, only once the fetch that produced them has
/// completed, and only when newer than what is already published.
#[derive(Debug)]
pub struct EntitlementContext {
    cache: SharedEntitlementCache,
    session: SessionToken,
    published: watch::Sender<Option<Arc<SubscriptionStatusResult>>>,
}

impl EntitlementContext {
    /// Create a context for `session` over a shared cache.
    pub fn new(cache: SharedEntitlementCache, session: SessionToken) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            cache,
            session,
            published,
        }
    }

    /// Get the session this context belongs to.
    pub fn session(&self) -> &SessionToken {
        &self.session
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &SharedEntitlementCache {
        &self.cache
    }

    /// Read the status through the cache and publish it.
    pub async fn status(&self) -> Result<Arc<SubscriptionStatusResult>> {
        let result = self.cache.fetch_status(&self.session).await?;
        self.publish(&result);
        Ok(result)
    }

    /// Last published result, regardless of age.
    pub fn current(&self) -> Option<Arc<SubscriptionStatusResult>> {
        self.published.borrow().clone()
    }

    /// Last published result if it is still within the cache TTL.
    pub fn fresh(&self) -> Option<Arc<SubscriptionStatusResult>> {
        let ttl = self.cache.config().ttl;
        self.current()
            .filter(|result| result.is_fresh(ttl, Utc::now()))
    }

    /// Subscribe to published results.
    pub fn subscribe(&self) -> StatusReceiver {
        self.published.subscribe()
    }

    /// Invalidate the cached status so the next read refetches.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&self.session).await;
    }

    /// Invalidate and read again, e.g. after a purchase completes.
    pub async fn refresh(&self) -> Result<Arc<SubscriptionStatusResult>> {
        self.invalidate().await;
        self.status().await
    }

    /// End the session (logout).
    ///
    /// Drops the cached status and closes the channel, which stops any
    /// observer driven by [`subscribe`](Self::subscribe).
    pub async fn end(self) {
        self.cache.end_session(&self.session).await;
        debug!(session = %self.session.key(), "entitlement context ended");
    }

    fn publish(&self, result: &Arc<SubscriptionStatusResult>) -> bool {
        self.published.send_if_modified(|current| match current {
            Some(existing) if existing.fetched_at >= result.fetched_at => false,
            _ => {
                *current = Some(Arc::clone(result));
                true
            }
        })
    }
}
