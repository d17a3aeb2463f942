//! Route guard
//!
//! Gates a view on the session's entitlement. A guard starts in
//! [`GuardState::Checking`] and settles once a classified result arrives:
//! entitled sessions are allowed, others are sent to the pricing page or, for
//! lenient guards, allowed in degraded mode.
//!
//! Navigation is a one-shot command issued through a [`Navigator`] at the
//! moment of the transition. Reading [`RouteGuard::view`] or
//! [`RouteGuard::decision`] never navigates.

use patron_types::{
    GuardConfig, GuardDecision, GuardState, GuardView, StatusKind, SubscriptionStatusResult,
    PRICING_ROUTE,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::context::{EntitlementContext, StatusReceiver};
use crate::{metrics, Result};

/// Issues navigation commands on behalf of a guard.
pub trait Navigator: Send + Sync {
    /// Navigate to `route`.
    fn navigate(&self, route: &str);
}

impl Navigator for mpsc::UnboundedSender<String> {
    fn navigate(&self, route: &str) {
        if self.send(route.to_string()).is_err() {
            debug!(route, "navigation receiver dropped");
        }
    }
}

/// Derive the guard decision for a classified kind.
///
/// `None` means no result has settled yet.
pub fn evaluate(config: &GuardConfig, kind: Option<StatusKind>) -> GuardDecision {
    match kind {
        None => GuardDecision {
            is_loading: config.show_loader,
            should_redirect: false,
        },
        Some(kind) => GuardDecision {
            is_loading: false,
            should_redirect: config.redirect_on_missing && !kind.is_entitled(),
        },
    }
}

/// Entitlement gate for one mounted view.
#[derive(Debug)]
pub struct RouteGuard<N> {
    config: GuardConfig,
    navigator: N,
    state: GuardState,
    observed: Option<StatusKind>,
}

impl<N: Navigator> RouteGuard<N> {
    /// Create a guard in the checking state.
    pub fn new(config: GuardConfig, navigator: N) -> Self {
        Self {
            config,
            navigator,
            state: GuardState::Checking,
            observed: None,
        }
    }

    /// Mount a guard, settling immediately when the context already holds a
    /// fresh result.
    pub fn mount(config: GuardConfig, navigator: N, ctx: &EntitlementContext) -> Self {
        let mut guard = Self::new(config, navigator);
        if let Some(result) = ctx.fresh() {
            guard.apply(&result);
        }
        guard
    }

    /// Current state.
    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Guard configuration.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Kind of the last applied result.
    pub fn observed(&self) -> Option<StatusKind> {
        self.observed
    }

    /// Decision for the current state.
    pub fn decision(&self) -> GuardDecision {
        evaluate(&self.config, self.observed)
    }

    /// What the view should render.
    pub fn view(&self) -> GuardView {
        match self.state {
            GuardState::Checking if self.config.show_loader => GuardView::Loader,
            GuardState::Checking | GuardState::Redirecting => GuardView::Placeholder,
            GuardState::Allowed { .. } => GuardView::Children,
        }
    }

    /// Read the status through `ctx` and apply it.
    ///
    /// Nothing is written until the read completes, so dropping this future
    /// leaves the guard as it was.
    pub async fn check(&mut self, ctx: &EntitlementContext) -> Result<GuardState> {
        if self.state == GuardState::Redirecting {
            return Ok(self.state);
        }
        let result = ctx.status().await?;
        Ok(self.apply(&result))
    }

    /// Apply published results until the guard redirects or the channel
    /// closes.
    pub async fn follow(&mut self, updates: &mut StatusReceiver) -> GuardState {
        while self.state != GuardState::Redirecting {
            if updates.changed().await.is_err() {
                break;
            }
            let latest = updates.borrow_and_update().clone();
            if let Some(result) = latest {
                self.apply(&result);
            }
        }
        self.state
    }

    /// Apply a settled result.
    pub fn apply(&mut self, result: &SubscriptionStatusResult) -> GuardState {
        if self.state == GuardState::Redirecting {
            return self.state;
        }

        let kind = result.kind();
        let decision = evaluate(&self.config, Some(kind));
        self.observed = Some(kind);

        self.state = if decision.should_redirect {
            debug!(kind = %kind, route = PRICING_ROUTE, "entitlement missing, redirecting");
            metrics::record_guard_redirect(kind);
            self.navigator.navigate(PRICING_ROUTE);
            GuardState::Redirecting
        } else if kind.is_entitled() {
            GuardState::Allowed { degraded: false }
        } else {
            warn!(kind = %kind, "entitlement missing, allowing degraded access");
            GuardState::Allowed { degraded: true }
        };

        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use patron_types::{StatusOutcome, SubscriptionDetails, SubscriptionStatus};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Navigator for &Recorder {
        fn navigate(&self, route: &str) {
            self.0.lock().unwrap().push(route.to_string());
        }
    }

    fn active() -> SubscriptionStatusResult {
        SubscriptionStatusResult::new(
            StatusOutcome::Active {
                subscription: SubscriptionDetails::new("Pro", SubscriptionStatus::Active),
            },
            Utc::now(),
        )
    }

    fn required() -> SubscriptionStatusResult {
        SubscriptionStatusResult::new(StatusOutcome::required("Pick a plan"), Utc::now())
    }

    fn failed() -> SubscriptionStatusResult {
        SubscriptionStatusResult::new(StatusOutcome::error("unavailable"), Utc::now())
    }

    #[test]
    fn test_evaluate_table() {
        let strict = GuardConfig::strict();
        let lenient = GuardConfig::lenient();

        assert_eq!(
            evaluate(&strict, None),
            GuardDecision {
                is_loading: true,
                should_redirect: false
            }
        );
        assert!(!evaluate(&strict.show_loader(false), None).is_loading);

        assert_eq!(evaluate(&strict, Some(StatusKind::Active)), GuardDecision::default());
        assert_eq!(
            evaluate(&strict, Some(StatusKind::FreeTrialActive)),
            GuardDecision::default()
        );
        assert!(evaluate(&strict, Some(StatusKind::SubscriptionRequired)).should_redirect);
        assert!(evaluate(&strict, Some(StatusKind::Error)).should_redirect);

        assert!(!evaluate(&lenient, Some(StatusKind::SubscriptionRequired)).should_redirect);
        assert!(!evaluate(&lenient, Some(StatusKind::Error)).should_redirect);
    }

    #[test]
    fn test_evaluate_is_stable() {
        let config = GuardConfig::strict();
        let first = evaluate(&config, Some(StatusKind::SubscriptionRequired));
        for _ in 0..10 {
            assert_eq!(evaluate(&config, Some(StatusKind::SubscriptionRequired)), first);
        }
    }

    #[test]
    fn test_checking_view() {
        let nav = Recorder::default();
        let guard = RouteGuard::new(GuardConfig::strict(), &nav);
        assert_eq!(guard.state(), GuardState::Checking);
        assert_eq!(guard.view(), GuardView::Loader);

        let quiet = RouteGuard::new(GuardConfig::strict().show_loader(false), &nav);
        assert_eq!(quiet.view(), GuardView::Placeholder);
    }

    #[test]
    fn test_entitled_is_allowed() {
        let nav = Recorder::default();
        let mut guard = RouteGuard::new(GuardConfig::strict(), &nav);
        assert_eq!(guard.observed(), None);

        assert_eq!(guard.apply(&active()), GuardState::Allowed { degraded: false });
        assert_eq!(guard.observed(), Some(StatusKind::Active));
        assert_eq!(guard.view(), GuardView::Children);
        assert!(nav.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_strict_redirects_exactly_once() {
        let nav = Recorder::default();
        let mut guard = RouteGuard::new(GuardConfig::strict(), &nav);

        assert_eq!(guard.apply(&required()), GuardState::Redirecting);
        assert_eq!(guard.view(), GuardView::Placeholder);
        assert!(guard.decision().should_redirect);

        // Terminal: later results and re-reads do not navigate again
        guard.apply(&required());
        guard.apply(&active());
        let _ = guard.view();
        let _ = guard.decision();

        assert_eq!(guard.state(), GuardState::Redirecting);
        assert_eq!(*nav.0.lock().unwrap(), vec![PRICING_ROUTE.to_string()]);
    }

    #[test]
    fn test_lenient_fails_open() {
        let nav = Recorder::default();
        let mut guard = RouteGuard::new(GuardConfig::lenient(), &nav);

        assert_eq!(guard.apply(&failed()), GuardState::Allowed { degraded: true });
        assert_eq!(guard.apply(&required()), GuardState::Allowed { degraded: true });
        assert_eq!(guard.observed(), Some(StatusKind::SubscriptionRequired));
        assert_eq!(guard.view(), GuardView::Children);
        assert!(nav.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_withdrawn_entitlement_redirects() {
        let nav = Recorder::default();
        let mut guard = RouteGuard::new(GuardConfig::strict(), &nav);

        guard.apply(&active());
        assert_eq!(guard.apply(&required()), GuardState::Redirecting);
        assert_eq!(nav.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_channel_navigator() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut guard = RouteGuard::new(GuardConfig::strict(), tx);

        guard.apply(&failed());
        assert_eq!(rx.try_recv().unwrap(), PRICING_ROUTE);
        assert!(rx.try_recv().is_err());
    }
}
