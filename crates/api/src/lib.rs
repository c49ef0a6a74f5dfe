//! HTTP API server with observability for the storefront backend.
//!
//! Provides REST endpoints for accounts, the catalog and order placement,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod mailer;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::{AppState, Backend, MemoryBackend, PostgresBackend};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<B: Backend>(state: Arc<AppState<B>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<B>))
        .route("/signup", post(routes::accounts::signup::<B>))
        .route("/login", post(routes::accounts::login::<B>))
        .route("/logout", post(routes::accounts::logout::<B>))
        .route("/logout-all", post(routes::accounts::logout_all::<B>))
        .route(
            "/users/me",
            get(routes::users::me::<B>)
                .patch(routes::users::update_me::<B>)
                .delete(routes::users::delete_me::<B>),
        )
        .route("/users", get(routes::users::list::<B>))
        .route("/users/{id}", get(routes::users::get::<B>))
        .route(
            "/products",
            get(routes::products::list::<B>).post(routes::products::create::<B>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<B>)
                .patch(routes::products::update::<B>)
                .delete(routes::products::delete::<B>),
        )
        .route(
            "/products/{id}/restock",
            post(routes::products::restock::<B>),
        )
        .route(
            "/orders",
            post(routes::orders::place::<B>).get(routes::orders::list::<B>),
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
