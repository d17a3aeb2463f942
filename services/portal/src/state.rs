//! Application state for the portal service.

use std::sync::Arc;

use patron_client::{EntitlementCache, SharedEntitlementCache, StatusSource};

use crate::config::Config;

/// Handles every route shares
#[derive(Clone)]
pub struct AppState {
    /// Entitlement cache shared by every guarded route
    pub cache: SharedEntitlementCache,
    /// Loaded at startup, never mutated
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state over a status source
    pub fn new(source: impl StatusSource + 'static, config: Config) -> Self {
        Self {
            cache: Arc::new(EntitlementCache::new(source, config.cache.clone())),
            config: Arc::new(config),
        }
    }

    /// Budget for one page request, status check and retries included
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
