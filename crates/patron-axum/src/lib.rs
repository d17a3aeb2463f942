//! Patron Axum Integration
//!
//! Axum middleware and extractors for gating routes on a subscription.
//!
//! # Quick Start
//!
//! ```ignore
//! use patron_axum::{RequireSubscription, SubscriptionLayer};
//! use patron_types::GuardConfig;
//! use axum::{Router, routing::get};
//!
//! async fn dashboard(sub: RequireSubscription) -> String {
//!     format!("Welcome back, {} subscriber", sub.kind())
//! }
//!
//! let app = Router::new()
//!     .route("/dashboard", get(dashboard))
//!     .layer(SubscriptionLayer::new(cache, GuardConfig::strict()));
//! ```
//!
//! # Extractors
//!
//! - [`RequireSubscription`] - Requires an entitled session (402 if missing, 503 if unknown)
//! - [`MaybeSubscription`] - Subscription context if the layer attached one
//! - [`RequireSession`] - Session token from the request (401 if missing)

pub mod context;
pub mod error;
pub mod extractors;
pub mod layer;

pub use context::{
    extract_session, SessionCookie, SessionSource, SubscriptionContext, SESSION_COOKIE,
};
pub use error::EntitlementError;
pub use extractors::{MaybeSubscription, RequireSession, RequireSubscription};
pub use layer::{SubscriptionLayer, SubscriptionService};
