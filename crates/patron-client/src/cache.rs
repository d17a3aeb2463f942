//! Entitlement cache
//!
//! Fetches and caches the classified subscription status per session so that
//! every guarded view mounted within one TTL window shares a single network
//! call.
//!
//! # Usage
//!
//! ```ignore
//! use patron_client::{CacheConfig, EntitlementCache, HttpStatusSource};
//!
//! let source = HttpStatusSource::new(client_config)?;
//! let cache = EntitlementCache::new(source, CacheConfig::default());
//!
//! // First call hits the backend
//! let status = cache.fetch_status(&session).await?;
//!
//! // Calls within the TTL, including concurrent ones, share that result
//! let again = cache.fetch_status(&session).await?;
//! ```

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use patron_types::{
    ErrorBody, StatusOutcome, SubscriptionStatusResult, DEFAULT_ERROR_MESSAGE,
    SUBSCRIPTION_REQUIRED_CODE,
};
use tracing::{debug, error, instrument, warn};

use crate::classify::{classify_outcome, ClassificationError, ClassificationPolicy, RawStatus};
use crate::config::{env_parse, ConfigError};
use crate::http::StatusSource;
use crate::retry::{retry_check, RetryConfig};
use crate::session::{SessionKey, SessionToken};
use crate::{metrics, ClientError, Result};

/// Shared handle to an entitlement cache.
pub type SharedEntitlementCache = Arc<EntitlementCache>;

/// Configuration for the entitlement cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a classified status is served without refetching.
    /// Default: 5 minutes
    pub ttl: Duration,

    /// Maximum number of sessions kept in the cache.
    /// Default: 10,000
    pub max_sessions: u64,

    /// Retry behaviour for transient failures.
    pub retry: RetryConfig,

    /// What to do with payloads the classifier rejects.
    pub classification: ClassificationPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            max_sessions: 10_000,
            retry: RetryConfig::default(),
            classification: ClassificationPolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the tunables from the environment, falling back to defaults.
    ///
    /// Reads `PATRON_STATUS_TTL_SECS`, `PATRON_STATUS_RETRIES` and
    /// `PATRON_RETRY_BACKOFF_MS`.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(secs) = env_parse::<u64>("PATRON_STATUS_TTL_SECS")? {
            if secs == 0 {
                return Err(ConfigError::Invalid("PATRON_STATUS_TTL_SECS"));
            }
            config = config.with_ttl(Duration::from_secs(secs));
        }
        if let Some(retries) = env_parse::<u32>("PATRON_STATUS_RETRIES")? {
            config = config.with_retry_attempts(retries);
        }
        if let Some(ms) = env_parse::<u64>("PATRON_RETRY_BACKOFF_MS")? {
            config = config.with_retry_backoff(Duration::from_millis(ms));
        }

        Ok(config)
    }

    /// Set the TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the maximum number of cached sessions.
    #[must_use]
    pub fn with_max_sessions(mut self, max: u64) -> Self {
        self.max_sessions = max;
        self
    }

    /// Replace the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the number of retries after the initial attempt.
    #[must_use]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry = self.retry.with_max_attempts(attempts);
        self
    }

    /// Set the base backoff delay between retries.
    #[must_use]
    pub fn with_retry_backoff(mut self, delay: Duration) -> Self {
        self.retry = self.retry.with_base_delay(delay);
        self
    }

    /// Set the classification policy.
    #[must_use]
    pub fn with_classification(mut self, policy: ClassificationPolicy) -> Self {
        self.classification = policy;
        self
    }
}

/// Cache key: the session plus the invalidation epochs it was read under.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct EntryKey {
    session: SessionKey,
    epoch: u64,
    generation: u64,
}

/// Request-deduplicating, TTL-bounded cache of classified statuses.
///
/// # Cache Behavior
///
/// - **Deduplication**: concurrent reads of a missing entry share one fetch
/// - **Errors**: transport failures become `ERROR` results and are cached
///   like any other result until the TTL elapses
/// - **Invalidation**: gives the session a new epoch, so reads issued
///   afterwards never join a fetch that started before
/// - **Bounded**: entries and epochs are both capped at `max_sessions`; a
///   session whose epoch was evicted or ended is handed a fresh one
///
/// # Thread Safety
///
/// The cache is thread-safe and meant to be shared across tasks via `Arc`.
pub struct EntitlementCache {
    source: Arc<dyn StatusSource>,
    entries: Cache<EntryKey, Arc<SubscriptionStatusResult>>,
    epochs: moka::sync::Cache<SessionKey, u64>,
    next_epoch: AtomicU64,
    generation: AtomicU64,
    last_fetched_micros: AtomicI64,
    config: CacheConfig,
}

impl std::fmt::Debug for EntitlementCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementCache")
            .field("config", &self.config)
            .field("entries", &self.entries.entry_count())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EntitlementCache {
    /// Create a new cache over `source`.
    pub fn new(source: impl StatusSource + 'static, config: CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_sessions)
            .time_to_live(config.ttl)
            .build();

        // Outlives the entry read under it, so an idle session keeps its key
        let epochs = moka::sync::Cache::builder()
            .max_capacity(config.max_sessions)
            .time_to_idle(config.ttl.saturating_mul(2))
            .build();

        Self {
            source: Arc::new(source),
            entries,
            epochs,
            next_epoch: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            last_fetched_micros: AtomicI64::new(0),
            config,
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Approximate number of cached entries.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Fetch the classified status for `session`.
    ///
    /// Returns the cached result when one exists within the TTL; otherwise
    /// issues one fetch shared by all concurrent callers. Transport failures
    /// never surface here: they resolve to an `ERROR` result. The only error
    /// is a [`ClientError::Classification`] under the strict policy.
    #[instrument(skip(self, session), fields(session = %session.key()), level = "debug")]
    pub async fn fetch_status(&self, session: &SessionToken) -> Result<Arc<SubscriptionStatusResult>> {
        let key = self.entry_key(&session.key());
        let loaded = AtomicBool::new(false);

        let result = self
            .entries
            .try_get_with(key, async {
                loaded.store(true, Ordering::Relaxed);
                self.load(session).await
            })
            .await;

        let hit = !loaded.load(Ordering::Relaxed);
        metrics::record_cache_lookup(hit);
        if hit {
            tracing::trace!("entitlement cache hit");
        }

        result.map_err(|e| ClientError::Classification((*e).clone()))
    }

    /// Read the cached status for `session` without fetching.
    pub async fn peek(&self, session: &SessionToken) -> Option<Arc<SubscriptionStatusResult>> {
        let key = self.current_key(&session.key())?;
        self.entries.get(&key).await
    }

    /// Invalidate the cached status for `session`.
    ///
    /// Once this returns, the next read fetches a fresh status and does not
    /// share any fetch that was already in flight.
    pub async fn invalidate(&self, session: &SessionToken) {
        let key = session.key();
        let stale = self.current_key(&key);
        let epoch = self.allocate_epoch();

        self.epochs.insert(key.clone(), epoch);
        if let Some(stale) = stale {
            self.entries.invalidate(&stale).await;
        }
        debug!(session = %key, epoch, "entitlement invalidated");
    }

    /// Discard everything cached for a session that has ended (logout).
    ///
    /// Leaves nothing behind; a later read under the same token starts over
    /// with a new epoch.
    pub async fn end_session(&self, session: &SessionToken) {
        let key = session.key();
        if let Some(stale) = self.current_key(&key) {
            self.epochs.invalidate(&key);
            self.entries.invalidate(&stale).await;
        }
        debug!(session = %key, "entitlement session ended");
    }

    /// Invalidate every cached status.
    pub fn invalidate_all(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries.invalidate_all();
        debug!(generation, "entitlement cache cleared");
    }

    /// Key for a read, handing the session an epoch if it has none.
    fn entry_key(&self, session: &SessionKey) -> EntryKey {
        let epoch = self.epochs.get_with(session.clone(), || self.allocate_epoch());
        self.key_at(session, epoch)
    }

    /// Key the session's entry currently lives under, if it has one.
    fn current_key(&self, session: &SessionKey) -> Option<EntryKey> {
        self.epochs.get(session).map(|epoch| self.key_at(session, epoch))
    }

    fn key_at(&self, session: &SessionKey, epoch: u64) -> EntryKey {
        EntryKey {
            session: session.clone(),
            epoch,
            generation: self.generation.load(Ordering::SeqCst),
        }
    }

    /// Epochs are never reused, so a forgotten epoch cannot revive an old key.
    fn allocate_epoch(&self) -> u64 {
        self.next_epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Run the status check with retries and classify the outcome.
    async fn load(
        &self,
        session: &SessionToken,
    ) -> std::result::Result<Arc<SubscriptionStatusResult>, ClassificationError> {
        let checked = retry_check(&self.config.retry, "check_status", || {
            self.source.check_status(session)
        })
        .await;

        let raw = match checked {
            Ok(payload) => RawStatus::Payload(payload),
            Err(ClientError::SubscriptionRequired { message }) => RawStatus::Rejected(ErrorBody {
                code: Some(SUBSCRIPTION_REQUIRED_CODE.to_string()),
                message,
            }),
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "status check failed, reporting ERROR");
                RawStatus::TransportFailed {
                    message: DEFAULT_ERROR_MESSAGE.to_string(),
                }
            }
        };

        let outcome = match classify_outcome(raw) {
            Ok(outcome) => outcome,
            Err(e) => match self.config.classification {
                ClassificationPolicy::Strict => {
                    error!(error = %e, "unclassifiable status payload");
                    return Err(e);
                }
                ClassificationPolicy::Degrade => {
                    error!(error = %e, "unclassifiable status payload, degrading to ERROR");
                    StatusOutcome::error(DEFAULT_ERROR_MESSAGE)
                }
            },
        };

        let result = SubscriptionStatusResult::new(outcome, self.stamp());
        metrics::record_status_fetch(result.kind());
        debug!(kind = %result.kind(), fetched_at = %result.fetched_at, "status fetched");

        Ok(Arc::new(result))
    }

    /// Completion timestamp, strictly increasing across fetches.
    fn stamp(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_micros();
        let prev = self
            .last_fetched_micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(now.max(prev + 1))
            })
            .unwrap_or_else(|prev| prev);

        DateTime::from_timestamp_micros(now.max(prev + 1)).unwrap_or_else(Utc::now)
    }
}
