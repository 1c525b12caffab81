//! Router assembly: HTTP endpoints, bearer-auth boundary, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::require_bearer;
use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - problem lookup under `/api/v1/problem/:id` (and the unversioned `/api/problem/:id`),
///   behind the bearer-auth middleware
/// - unauthenticated health check at `/api/v1/health`
/// - permissive CORS when `permissive_cors` is set (development)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>, permissive_cors: bool) -> Router {
    let problems = Router::new()
        .route("/api/v1/problem/:id", get(http::http_get_problem))
        .route("/api/v1/problem/", get(http::http_get_problem_without_id))
        .route("/api/problem/:id", get(http::http_get_problem))
        .route("/api/problem/", get(http::http_get_problem_without_id))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    let app = Router::new()
        .route("/api/v1/health", get(http::http_health))
        .merge(problems)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    if permissive_cors {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        app
    }
}
