//! HTTP API server with observability for the provenance ledger.
//!
//! Provides REST endpoints for company onboarding, product provenance and
//! the order lifecycle, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use common::{Clock, SystemClock};
use ledger_store::LedgerStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: LedgerStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/companies", post(routes::companies::register::<S>))
        .route("/companies/{address}", get(routes::companies::get::<S>))
        .route("/companies/id/{id}", get(routes::companies::get_by_id::<S>))
        .route(
            "/companies/{address}/deactivate",
            post(routes::companies::deactivate::<S>),
        )
        .route("/products", post(routes::products::mint::<S>))
        .route(
            "/products/manufacture",
            post(routes::products::manufacture::<S>),
        )
        .route("/products/{id}", get(routes::products::get::<S>))
        .route(
            "/products/{id}/traceability",
            get(routes::products::traceability::<S>),
        )
        .route("/products/{id}/tree", get(routes::products::tree::<S>))
        .route(
            "/products/{id}/descendants",
            get(routes::products::descendants::<S>),
        )
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/history", get(routes::orders::history::<S>))
        .route("/orders/{id}/details", get(routes::orders::details::<S>))
        .route("/orders/{id}/events", post(routes::orders::record_event::<S>))
        .route(
            "/orders/{id}/deadlines",
            post(routes::orders::check_deadlines::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over `store`, on the system clock.
pub fn create_default_state<S: LedgerStore + Clone + 'static>(
    store: S,
    max_commit_attempts: u32,
) -> Arc<AppState<S>> {
    create_state(store, max_commit_attempts, Arc::new(SystemClock))
}

/// Creates the application state over `store`, reading time from `clock`.
pub fn create_state<S: LedgerStore + Clone + 'static>(
    store: S,
    max_commit_attempts: u32,
    clock: Arc<dyn Clock>,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, max_commit_attempts, clock))
}
