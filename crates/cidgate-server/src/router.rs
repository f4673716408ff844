use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::catch_panic::CatchPanicLayer;

use crate::auth::require_basic_auth;
use crate::handler;
use crate::logging::log_requests;
use crate::state::AppState;

/// Build the axum router with all gatekeeper endpoints.
///
/// Every route requires Basic credentials. Request bodies larger than
/// `max_upload_size` bytes are rejected.
pub fn build_router(state: AppState, max_upload_size: usize) -> Router {
    Router::new()
        .route("/add", post(handler::add_handler))
        .route("/remove/:cid", post(handler::remove_handler))
        .route("/list", get(handler::list_handler))
        .route("/healthz", get(handler::health_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_basic_auth))
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}
