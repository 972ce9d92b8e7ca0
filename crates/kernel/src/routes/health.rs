//! Health check endpoint.

use axum::Router;
use axum::routing::get;

use crate::state::AppState;

/// Health check handler.
async fn health_check() -> &'static str {
    "ok"
}

/// Create the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
