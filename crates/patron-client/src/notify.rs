//! Notification side-channel
//!
//! Raises toasts when the classified entitlement kind changes. Results are
//! compared by kind, so re-fetching an identical status raises nothing.

use patron_types::{StatusKind, SubscriptionStatusResult, Toast, DEFAULT_REQUIRED_MESSAGE};
use tokio::sync::mpsc;
use tracing::debug;

use crate::context::StatusReceiver;

/// Delivers toasts to whatever displays them.
pub trait Notifier: Send + Sync {
    /// Show `toast`.
    fn notify(&self, toast: Toast);
}

impl Notifier for mpsc::UnboundedSender<Toast> {
    fn notify(&self, toast: Toast) {
        if self.send(toast).is_err() {
            debug!("toast receiver dropped");
        }
    }
}

/// Tracks the last settled kind and decides which toast a new result raises.
///
/// `ERROR` results are ignored entirely: they raise nothing and do not move
/// the baseline, so recovering from a transient failure is not announced as a
/// new subscription.
#[derive(Debug, Clone, Default)]
pub struct TransitionObserver {
    last: Option<StatusKind>,
}

impl TransitionObserver {
    /// Create an observer with no baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last settled kind, if any.
    pub fn last_kind(&self) -> Option<StatusKind> {
        self.last
    }

    /// Observe a result and return the toast it raises, if any.
    pub fn observe(&mut self, result: &SubscriptionStatusResult) -> Option<Toast> {
        let kind = result.kind();
        if kind == StatusKind::Error {
            return None;
        }

        let previous = self.last.replace(kind);
        if previous == Some(kind) {
            return None;
        }

        match kind {
            StatusKind::SubscriptionRequired => Some(Toast::subscription_required(
                result.message().unwrap_or(DEFAULT_REQUIRED_MESSAGE),
            )),
            StatusKind::Active | StatusKind::FreeTrialActive => {
                let newly_entitled = match previous {
                    // First settled value
                    None => false,
                    Some(StatusKind::FreeTrialActive) => kind == StatusKind::Active,
                    Some(prev) => !prev.is_entitled(),
                };
                if !newly_entitled {
                    return None;
                }
                result
                    .subscription()
                    .map(|subscription| Toast::subscription_active(&subscription.package_name))
            }
            StatusKind::Error => None,
        }
    }
}

/// Drive a [`TransitionObserver`] from published results until the
/// publishing context is dropped.
pub async fn watch_transitions<N: Notifier>(mut updates: StatusReceiver, notifier: N) {
    let mut observer = TransitionObserver::new();

    // A value published before the watcher started is still a first value
    let initial = updates.borrow_and_update().clone();
    if let Some(result) = initial {
        if let Some(toast) = observer.observe(&result) {
            notifier.notify(toast);
        }
    }

    while updates.changed().await.is_ok() {
        let latest = updates.borrow_and_update().clone();
        let Some(result) = latest else { continue };

        if let Some(toast) = observer.observe(&result) {
            debug!(kind = %result.kind(), variant = ?toast.variant, "raising entitlement toast");
            notifier.notify(toast);
        }
    }

    debug!("entitlement updates closed, stopping toast watcher");
}
