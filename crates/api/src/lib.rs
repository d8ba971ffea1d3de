//! HTTP API layer for askanai.
//!
//! - **Endpoints**: accounts, polls, responses, comments, reports, uploads
//!   and the moderation panel
//! - **Extractors**: caller identity, admin guard, lenient JSON bodies
//! - **Middleware**: bearer authentication, CORS, no-store headers
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::{Router, middleware::from_fn_with_state};

pub use endpoints::router;
pub use middleware::AppState;

/// The API router with authentication, CORS and cache headers applied.
pub fn app(state: AppState) -> Router {
    let cors = middleware::cors_layer(&state.config.security.allowed_origins);

    router()
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware))
        .layer(cors)
        .layer(middleware::no_store_layer())
        .layer(middleware::no_cache_layer())
        .with_state(state)
}
