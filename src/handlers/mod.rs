//! HTTP layer: thin axum wrappers over the checkout service.

pub mod checkout;
pub mod health;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::catalog::Catalog;
use crate::checkout::CheckoutService;
use crate::rate_limiter::{rate_limit_middleware, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub checkout: Arc<CheckoutService>,
    pub catalog: Arc<Catalog>,
}

/// Build the application router. The rate limiter, when provided, guards the
/// checkout route only.
pub fn app_router(state: AppState, limiter: Option<Arc<RateLimiter>>) -> Router {
    let mut checkout_route = get(checkout::start_checkout);
    if let Some(limiter) = limiter {
        checkout_route =
            checkout_route.route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
    }

    Router::new()
        .route("/health", get(health::health_check))
        .route("/checkout", checkout_route)
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": "The requested endpoint does not exist",
            "available_endpoints": ["/health", "/checkout"],
        })),
    )
}
