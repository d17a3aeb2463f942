//! Patron Types - Shared domain types
//!
//! This crate contains domain types used across the Patron entitlement gate:
//! - Subscription details as reported by the backend
//! - Wire payloads of the status check endpoint
//! - Classified entitlement results and guard decisions
//! - Notification payloads

pub mod guard;
pub mod status;
pub mod subscription;
pub mod toast;

pub use guard::*;
pub use status::*;
pub use subscription::*;
pub use toast::*;

/// Route protected views redirect to when entitlement is missing.
pub const PRICING_ROUTE: &str = "/pricing";

/// Route the success notification links to.
pub const DASHBOARD_ROUTE: &str = "/dashboard";
