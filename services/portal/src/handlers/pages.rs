//! Page handlers
//!
//! `/dashboard` sits behind a strict guard and `/reports` behind a lenient
//! one; `/pricing` is open to everyone.

use axum::Json;
use patron_axum::{MaybeSubscription, RequireSubscription};
use patron_types::StatusKind;
use serde::Serialize;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResponse {
    pub title: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub package_name: String,
    pub plan_name: Option<String>,
    pub status: StatusKind,
    pub is_trial: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsResponse {
    pub full_access: bool,
    pub status: Option<StatusKind>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /pricing
pub async fn pricing() -> Json<PricingResponse> {
    Json(PricingResponse {
        title: "Plans",
        message: "Choose a plan to unlock the dashboard.",
    })
}

/// GET /dashboard
pub async fn dashboard(sub: RequireSubscription) -> Json<DashboardResponse> {
    let (package_name, plan_name, is_trial) = sub
        .subscription()
        .map(|s| (s.package_name.clone(), s.plan_name.clone(), s.is_trial()))
        .unwrap_or_default();

    Json(DashboardResponse {
        package_name,
        plan_name,
        status: sub.kind(),
        is_trial,
    })
}

/// GET /reports
///
/// Full reports for subscribers, a preview for everyone else.
pub async fn reports(sub: MaybeSubscription) -> Json<ReportsResponse> {
    let status = sub.as_ref().map(|ctx| ctx.kind());
    Json(ReportsResponse {
        full_access: sub.as_ref().is_some_and(|ctx| ctx.is_entitled()),
        status,
    })
}
