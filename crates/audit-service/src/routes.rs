//! Router assembly: the one authenticated endpoint plus an unauthenticated health probe.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, history};
use crate::middleware::auth::authorize;
use crate::AppState;

/// Builds the service's router.
///
/// `route_layer` (rather than `layer`) attaches the Authorizer so it runs *after*
/// axum's own route matching: by the time it executes, the request is known to match
/// `/api/v1/sessions/:id/history`, and nothing upstream of the match (like `/health`)
/// is forced through authorization.
pub fn build_routes(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let history_route = Router::new()
        .route("/api/v1/sessions/:session_id/history", get(history::get_history))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), authorize));

    Router::new()
        .route("/health", get(health))
        .merge(history_route)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
