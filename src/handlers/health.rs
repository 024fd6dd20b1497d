//! `GET /health`: liveness probe with catalog summary.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use super::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "checkout-router",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "services_configured": state.catalog.len(),
        "accepts_display_text": true,
        "fuzzy_matching": true,
    }))
}
