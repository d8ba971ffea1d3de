//! API endpoints.

mod admin;
mod auth;
mod polls;
mod storage;

use askanai_common::AppError;
use axum::Router;

use crate::middleware::AppState;

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/polls", polls::router())
        .nest("/storage", storage::router())
        .nest("/admin", admin::router())
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
}
