//! HTTP endpoint handlers

use axum::http::Uri;
use tracing::debug;

/// Catch-all placeholder: answer every request with its path
pub async fn echo_path_handler(uri: Uri) -> String {
    debug!(path = %uri.path(), "Echoing request path");
    format!("Yey! {}\n", uri.path())
}
