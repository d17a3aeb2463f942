//! Shared fixtures for patron-client integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use patron_client::{
    CacheConfig, ClassificationPolicy, EntitlementCache, EntitlementContext, Result, RetryConfig,
    SessionToken, StatusSource,
};
use patron_types::{CheckStatusResponse, SubscriptionDetails};

type Responder = dyn Fn(usize) -> Result<CheckStatusResponse> + Send + Sync;

/// Status source answering from a closure keyed by call number.
#[derive(Clone)]
pub struct FakeSource {
    calls: Arc<AtomicUsize>,
    delay: Duration,
    respond: Arc<Responder>,
}

impl FakeSource {
    pub fn new(respond: impl Fn(usize) -> Result<CheckStatusResponse> + Send + Sync + 'static) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            respond: Arc::new(respond),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of times the source was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for FakeSource {
    async fn check_status(&self, _session: &SessionToken) -> Result<CheckStatusResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.respond)(call)
    }
}

pub fn subscribed(package: &str) -> CheckStatusResponse {
    CheckStatusResponse::subscribed(SubscriptionDetails::named(package))
}

pub fn unsubscribed() -> CheckStatusResponse {
    CheckStatusResponse::unsubscribed(Some("Choose a plan to continue".to_string()))
}

/// Cache config with fast retries, suitable for tests.
pub fn test_config() -> CacheConfig {
    CacheConfig::default()
        .with_ttl(Duration::from_secs(60))
        .with_retry(
            RetryConfig::new()
                .with_max_attempts(2)
                .with_base_delay(Duration::from_millis(1))
                .with_jitter(false),
        )
        .with_classification(ClassificationPolicy::Strict)
}

pub fn cache(source: &FakeSource, config: CacheConfig) -> Arc<EntitlementCache> {
    Arc::new(EntitlementCache::new(source.clone(), config))
}

pub fn context(source: &FakeSource, config: CacheConfig) -> EntitlementContext {
    EntitlementContext::new(cache(source, config), SessionToken::new("session-token"))
}
