//! The user-facing HTTP API: route table and middleware stack.

pub mod error;
pub mod extractors;
pub mod handlers;

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::bootstrap::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the `/api/v1` router over shared [`AppState`], matching the
/// method/path table of `spec.md` §6.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/register", post(handlers::register))
        .route("/api/v1/login", post(handlers::login))
        .route("/api/v1/refresh", post(handlers::refresh))
        .route("/api/v1/logout", post(handlers::logout))
        .route("/api/v1/calculate", post(handlers::calculate))
        .route(
            "/api/v1/expressions",
            get(handlers::list_expressions),
        )
        .route(
            "/api/v1/expressions/{id}",
            get(handlers::get_expression),
        )
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
