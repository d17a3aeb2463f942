//! Patron Client - entitlement gate for subscription-backed views
//!
//! Reads subscription status from the Patron API, caches the classified
//! result per session, gates views on it and raises toasts when it changes.

pub mod cache;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod http;
pub mod metrics;
pub mod notify;
pub mod retry;
pub mod session;

pub use cache::{CacheConfig, EntitlementCache, SharedEntitlementCache};
pub use classify::{classify, ClassificationError, ClassificationPolicy, RawStatus};
pub use config::{ClientConfig, ConfigError};
pub use context::{EntitlementContext, StatusReceiver};
pub use error::{ClientError, Result};
pub use guard::{evaluate, Navigator, RouteGuard};
pub use http::{HttpStatusSource, StatusSource};
pub use notify::{watch_transitions, Notifier, TransitionObserver};
pub use retry::RetryConfig;
pub use session::{SessionKey, SessionToken};
