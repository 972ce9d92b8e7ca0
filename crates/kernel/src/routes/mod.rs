//! HTTP route handlers.

use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

pub mod health;
pub mod login;

/// All routes of the demonstration server.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(login::router())
        .merge(health::router())
        .fallback(not_found)
}

async fn not_found() -> AppError {
    AppError::NotFound
}
