//! Subscription handlers

use axum::extract::State;
use axum::Json;
use patron_axum::{EntitlementError, RequireSession};
use patron_client::{EntitlementContext, TransitionObserver};
use patron_types::{SubscriptionStatusResult, Toast};
use serde::Serialize;

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub status: SubscriptionStatusResult,
    /// Toast raised by the change, if the kind changed
    pub toast: Option<Toast>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /subscriptions/status
pub async fn get_status(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<SubscriptionStatusResult>, EntitlementError> {
    let status = state.cache.fetch_status(&session).await?;
    Ok(Json(status.as_ref().clone()))
}

/// POST /subscriptions/refresh
///
/// Called after a purchase completes. Drops the caller's cached status,
/// reads it again and reports the toast the change raises.
pub async fn refresh_status(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<RefreshResponse>, EntitlementError> {
    let ctx = EntitlementContext::new(state.cache.clone(), session);
    let previous = state.cache.peek(ctx.session()).await;

    let status = ctx.refresh().await?;
    metrics::counter!("portal_subscription_refreshes_total", "kind" => status.kind().as_str())
        .increment(1);

    let mut observer = TransitionObserver::new();
    if let Some(previous) = previous {
        observer.observe(&previous);
    }
    let toast = observer.observe(&status);

    tracing::info!(
        session = %ctx.session().key(),
        kind = %status.kind(),
        toast = toast.is_some(),
        "subscription status refreshed"
    );

    Ok(Json(RefreshResponse {
        status: status.as_ref().clone(),
        toast,
    }))
}
