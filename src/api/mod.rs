//! HTTP API module
//!
//! Placeholder routes served by the optional listener.

pub mod handlers;

use axum::Router;
use tower_http::trace::TraceLayer;

use handlers::*;

/// Create the HTTP router: a single catch-all route echoing the request path
pub fn create_router() -> Router {
    Router::new()
        .fallback(echo_path_handler)
        .layer(TraceLayer::new_for_http())
}
