//! End-to-end behaviour of the entitlement gate: cache, guard and toasts
//! working together over a fake status source.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{cache, context, subscribed, test_config, unsubscribed, FakeSource};
use futures::future::join_all;
use patron_client::{ClientError, RouteGuard, SessionToken, TransitionObserver};
use patron_types::{GuardConfig, GuardState, GuardView, StatusKind, ToastVariant, PRICING_ROUTE};
use reqwest::StatusCode;
use tokio::sync::mpsc;

// =============================================================================
// Cache
// =============================================================================

#[tokio::test]
async fn test_concurrent_reads_share_one_fetch() {
    let source = FakeSource::new(|_| Ok(subscribed("Pro"))).with_delay(Duration::from_millis(50));
    let cache = cache(&source, test_config());
    let session = SessionToken::new("session-token");

    let reads = (0..20).map(|_| cache.fetch_status(&session));
    let results = join_all(reads).await;

    assert_eq!(source.calls(), 1);
    let first = results[0].as_ref().unwrap();
    for result in &results {
        assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
    }
}

#[tokio::test]
async fn test_sessions_are_cached_separately() {
    let source = FakeSource::new(|_| Ok(subscribed("Pro")));
    let cache = cache(&source, test_config());

    cache.fetch_status(&SessionToken::new("alice")).await.unwrap();
    cache.fetch_status(&SessionToken::new("bob")).await.unwrap();
    cache.fetch_status(&SessionToken::new("alice")).await.unwrap();

    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_ttl_expiry_refetches_once() {
    let source = FakeSource::new(|_| Ok(subscribed("Pro")));
    let cache = cache(&source, test_config().with_ttl(Duration::from_millis(100)));
    let session = SessionToken::new("session-token");

    cache.fetch_status(&session).await.unwrap();
    cache.fetch_status(&session).await.unwrap();
    assert_eq!(source.calls(), 1);

    tokio::time::sleep(Duration::from_millis(150)).await;

    cache.fetch_status(&session).await.unwrap();
    cache.fetch_status(&session).await.unwrap();
    cache.fetch_status(&session).await.unwrap();
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_invalidate_does_not_join_inflight_fetch() {
    let source = FakeSource::new(|call| {
        if call == 0 {
            Ok(unsubscribed())
        } else {
            Ok(subscribed("Pro"))
        }
    })
    .with_delay(Duration::from_millis(100));
    let cache = cache(&source, test_config());
    let session = SessionToken::new("session-token");

    let stale = {
        let cache = Arc::clone(&cache);
        let session = session.clone();
        tokio::spawn(async move { cache.fetch_status(&session).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    cache.invalidate(&session).await;
    let fresh = cache.fetch_status(&session).await.unwrap();

    assert_eq!(fresh.kind(), StatusKind::Active);
    assert_eq!(
        stale.await.unwrap().unwrap().kind(),
        StatusKind::SubscriptionRequired
    );
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_invalidate_all_refetches_every_session() {
    let source = FakeSource::new(|_| Ok(subscribed("Pro")));
    let cache = cache(&source, test_config());
    let alice = SessionToken::new("alice");

    cache.fetch_status(&alice).await.unwrap();
    cache.invalidate_all();
    assert!(cache.peek(&alice).await.is_none());

    cache.fetch_status(&alice).await.unwrap();
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_result_timestamps_increase() {
    let source = FakeSource::new(|_| Ok(subscribed("Pro")));
    let ctx = context(&source, test_config());

    let mut previous = ctx.status().await.unwrap().fetched_at;
    for _ in 0..5 {
        let next = ctx.refresh().await.unwrap().fetched_at;
        assert!(next > previous);
        previous = next;
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_purchase_allows_and_raises_success_once() {
    let source = FakeSource::new(|call| {
        if call == 0 {
            Ok(unsubscribed())
        } else {
            Ok(subscribed("Pro"))
        }
    });
    let ctx = context(&source, test_config());
    let mut updates = ctx.subscribe();
    let mut observer = TransitionObserver::new();
    let mut toasts = Vec::new();

    // Pricing page reads the status before the purchase
    ctx.status().await.unwrap();
    if let Some(result) = updates.borrow_and_update().clone() {
        toasts.extend(observer.observe(&result));
    }

    // Purchase completes, status is refreshed
    ctx.refresh().await.unwrap();
    if let Some(result) = updates.borrow_and_update().clone() {
        toasts.extend(observer.observe(&result));
    }

    let (nav, mut routes) = mpsc::unbounded_channel();
    let guard = RouteGuard::mount(GuardConfig::strict(), nav, &ctx);
    assert_eq!(guard.state(), GuardState::Allowed { degraded: false });
    assert_eq!(guard.view(), GuardView::Children);
    assert!(routes.try_recv().is_err());

    // A re-read of the same result raises nothing more
    ctx.status().await.unwrap();
    assert!(!updates.has_changed().unwrap());

    let successes: Vec<_> = toasts
        .iter()
        .filter(|t| t.variant == ToastVariant::Success)
        .collect();
    assert_eq!(successes.len(), 1);
    assert!(successes[0].description.contains("Pro"));
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_required_redirects_once_and_alerts_once() {
    let source = FakeSource::new(|_| {
        Err(ClientError::SubscriptionRequired {
            message: Some("Your trial has ended".to_string()),
        })
    });
    let ctx = context(&source, test_config());
    let mut observer = TransitionObserver::new();
    let (nav, mut routes) = mpsc::unbounded_channel();
    let mut guard = RouteGuard::new(GuardConfig::strict(), nav);

    assert_eq!(guard.check(&ctx).await.unwrap(), GuardState::Redirecting);
    assert_eq!(guard.check(&ctx).await.unwrap(), GuardState::Redirecting);
    assert_eq!(guard.view(), GuardView::Placeholder);

    let result = ctx.current().unwrap();
    let toast = observer.observe(&result).unwrap();
    assert_eq!(toast.variant, ToastVariant::Alert);
    assert_eq!(toast.description, "Your trial has ended");
    assert!(observer.observe(&ctx.status().await.unwrap()).is_none());

    assert_eq!(routes.try_recv().unwrap(), PRICING_ROUTE);
    assert!(routes.try_recv().is_err());
    // Business answer, never retried
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_lenient_guard_fails_open_but_still_alerts() {
    let source = FakeSource::new(|_| {
        Err(ClientError::SubscriptionRequired { message: None })
    });
    let ctx = context(&source, test_config());
    let mut observer = TransitionObserver::new();
    let (nav, mut routes) = mpsc::unbounded_channel();
    let mut guard = RouteGuard::new(GuardConfig::lenient(), nav);

    assert_eq!(
        guard.check(&ctx).await.unwrap(),
        GuardState::Allowed { degraded: true }
    );
    assert!(!guard.decision().should_redirect);
    assert!(routes.try_recv().is_err());

    let toast = observer.observe(&ctx.current().unwrap()).unwrap();
    assert_eq!(toast.variant, ToastVariant::Alert);
}

#[tokio::test]
async fn test_errors_are_cached_until_ttl() {
    let source = FakeSource::new(|_| {
        Err(ClientError::from_status(
            StatusCode::SERVICE_UNAVAILABLE,
            "maintenance",
        ))
    });
    let cache = cache(&source, test_config().with_ttl(Duration::from_millis(200)));
    let session = SessionToken::new("session-token");

    for _ in 0..3 {
        let result = cache.fetch_status(&session).await.unwrap();
        assert_eq!(result.kind(), StatusKind::Error);
    }
    // Initial attempt plus two retries, for the first read only
    assert_eq!(source.calls(), 3);

    tokio::time::sleep(Duration::from_millis(250)).await;
    cache.fetch_status(&session).await.unwrap();
    assert_eq!(source.calls(), 6);
}

#[tokio::test]
async fn test_dropped_check_leaves_state_untouched() {
    let source = FakeSource::new(|_| Ok(subscribed("Pro"))).with_delay(Duration::from_millis(200));
    let ctx = context(&source, test_config());
    let updates = ctx.subscribe();
    let (nav, mut routes) = mpsc::unbounded_channel();
    let mut guard = RouteGuard::new(GuardConfig::strict(), nav);

    let unmounted = tokio::time::timeout(Duration::from_millis(20), guard.check(&ctx)).await;
    assert!(unmounted.is_err());

    assert_eq!(guard.state(), GuardState::Checking);
    assert_eq!(guard.view(), GuardView::Loader);
    assert!(ctx.current().is_none());
    assert!(!updates.has_changed().unwrap());
    assert!(routes.try_recv().is_err());
    assert!(ctx.cache().peek(ctx.session()).await.is_none());
}

#[tokio::test]
async fn test_follow_redirects_when_entitlement_is_withdrawn() {
    let source = FakeSource::new(|call| {
        if call == 0 {
            Ok(subscribed("Pro"))
        } else {
            Ok(unsubscribed())
        }
    });
    let ctx = context(&source, test_config());
    let mut updates = ctx.subscribe();
    let (nav, mut routes) = mpsc::unbounded_channel();
    let mut guard = RouteGuard::new(GuardConfig::strict(), nav);

    assert_eq!(
        guard.check(&ctx).await.unwrap(),
        GuardState::Allowed { degraded: false }
    );

    let (state, refreshed) = tokio::join!(guard.follow(&mut updates), ctx.refresh());

    assert_eq!(refreshed.unwrap().kind(), StatusKind::SubscriptionRequired);
    assert_eq!(state, GuardState::Redirecting);
    assert_eq!(routes.try_recv().unwrap(), PRICING_ROUTE);
    assert!(routes.try_recv().is_err());
}
