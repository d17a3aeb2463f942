//! Patron Portal
//!
//! Web portal whose premium pages are gated on the visitor's subscription.
//!
//! ## Pages
//!
//! - `GET /pricing` - Plans, open to everyone
//! - `GET /dashboard` - Subscribers only, everyone else is sent to `/pricing`
//! - `GET /reports` - Full reports for subscribers, a preview otherwise
//!
//! ## Subscription Endpoints
//!
//! - `GET /subscriptions/status` - Classified status of the caller's session
//! - `POST /subscriptions/refresh` - Re-read the status after a purchase
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /metrics` - Prometheus metrics

mod config;
mod handlers;
mod state;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use patron_axum::SubscriptionLayer;
use patron_client::HttpStatusSource;
use patron_types::GuardConfig;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::handlers::health;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("portal=debug".parse()?)
                .add_directive("patron_client=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Patron Portal");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        api_url = config.client.api_url(),
        status_ttl_secs = config.cache.ttl.as_secs(),
        status_retries = config.cache.retry.max_attempts,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    let source = HttpStatusSource::new(config.client.clone())?;
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(source, config);

    let app = build_router(state, metrics_handle);
    run_http_server(app, http_addr).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    // Subscribers only
    let strict = Router::new()
        .route("/dashboard", get(handlers::dashboard))
        .layer(SubscriptionLayer::new(state.cache.clone(), GuardConfig::strict()));

    // Fails open, handlers decide what to show
    let lenient = Router::new()
        .route("/reports", get(handlers::reports))
        .layer(SubscriptionLayer::new(state.cache.clone(), GuardConfig::lenient()));

    let open = Router::new()
        .route("/pricing", get(handlers::pricing))
        .route("/subscriptions/status", get(handlers::get_status))
        .route("/subscriptions/refresh", post(handlers::refresh_status));

    // Health route (no timeout - must always respond quickly)
    let health_routes = Router::new().route("/health", get(health));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .merge(strict)
        .merge(lenient)
        .merge(open)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Status checks should settle well under a second, retries included
    let status_latency_buckets = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(patron_client::metrics::REQUEST_DURATION_SECONDS.to_string()),
            status_latency_buckets,
        )?
        .install_recorder()?;

    patron_client::metrics::describe_metrics();
    metrics::describe_counter!(
        "portal_subscription_refreshes_total",
        "Subscription status refreshes by resulting kind"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
