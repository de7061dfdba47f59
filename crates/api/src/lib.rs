//! HTTP API server for the customer service.
//!
//! Exposes customer registration, search and lifecycle endpoints over a
//! [`CustomerService`], with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::{CustomerRepository, CustomerService};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::customers::{self, AppState};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R: CustomerRepository + 'static>(
    state: Arc<AppState<R>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/customers",
            post(customers::create::<R>).get(customers::list::<R>),
        )
        .route(
            "/customers/{id}",
            get(customers::get::<R>)
                .patch(customers::update::<R>)
                .delete(customers::delete::<R>),
        )
        .route(
            "/customers/{id}/fitter",
            put(customers::assign_fitter::<R>).delete(customers::remove_fitter::<R>),
        )
        .route("/customers/{id}/status", put(customers::change_status::<R>))
        .route("/customers/{id}/integrity", get(customers::integrity::<R>))
        .route(
            "/customers/{id}/order-eligibility",
            get(customers::order_eligibility::<R>),
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

/// Creates the application state over the given repository.
pub fn create_state<R: CustomerRepository + 'static>(repository: R) -> Arc<AppState<R>> {
    Arc::new(AppState {
        customer_service: CustomerService::new(repository),
    })
}
