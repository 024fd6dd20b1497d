//! End-to-end tests for the checkout redirector.
//!
//! Tests cover:
//! - Paid orders: one session-creation call, 303 to the hosted session URL
//! - Free orders: direct 303 to the thank-you page, no provider call
//! - Validation failures: specific 400 responses, provider untouched
//! - Provider failures: generic 500 without leaked detail
//! - Health endpoint, 404 fallback, and checkout rate limiting

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{location, response_json, TestApp, CANCEL_URL, SESSION_URL, SUCCESS_URL};
use checkout_router::rate_limiter::{RateLimitConfig, RateLimiter};

// ==================== Paid orders ====================

#[tokio::test]
async fn paid_order_redirects_to_hosted_session() {
    let app = TestApp::new();

    let response = app
        .get("/checkout?sid=sub_123&services=INTFMT,COVER&email=author%40example.com")
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), SESSION_URL);

    assert_eq!(app.provider.call_count(), 1);
    let request = app.provider.last_request();
    assert_eq!(
        request
            .line_items
            .iter()
            .map(|i| i.price_ref.as_str())
            .collect::<Vec<_>>(),
        vec!["price_int", "price_cov"]
    );
    assert!(request.line_items.iter().all(|i| i.quantity == 1));
    assert_eq!(request.metadata.submission_id, "sub_123");
    assert_eq!(request.metadata.service_codes, "INTFMT,COVER");
    assert_eq!(request.customer_email.as_deref(), Some("author@example.com"));
    assert_eq!(
        request.success_url,
        format!(
            "{}?sid=sub_123&session_id={{CHECKOUT_SESSION_ID}}",
            SUCCESS_URL
        )
    );
    assert_eq!(request.cancel_url, format!("{}?sid=sub_123", CANCEL_URL));
}

#[tokio::test]
async fn display_text_selection_resolves_through_fuzzy_matching() {
    let app = TestApp::new();

    // "Cover Design — $149, Interior   Formatting" as the form submits it.
    let response = app
        .get("/checkout?sid=sub_1&services=Cover%20Design%20%E2%80%94%20%24149,%20Interior%20%20%20Formatting")
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let request = app.provider.last_request();
    assert_eq!(request.metadata.service_codes, "COVER,INTFMT");
}

#[tokio::test]
async fn duplicate_selections_collapse_to_one_line_item() {
    let app = TestApp::new();

    let response = app
        .get("/checkout?sid=sub_1&services=INTFMT,intfmt,Interior%20Formatting")
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let request = app.provider.last_request();
    assert_eq!(request.line_items.len(), 1);
    assert_eq!(request.metadata.service_codes, "INTFMT");
}

#[tokio::test]
async fn email_is_optional() {
    let app = TestApp::new();

    let response = app.get("/checkout?sid=sub_1&services=COVER").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.provider.last_request().customer_email, None);
}

// ==================== Free orders ====================

#[tokio::test]
async fn all_free_order_skips_provider_entirely() {
    let app = TestApp::new();

    let response = app.get("/checkout?sid=sub_9&services=KDPPREP").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("{}?sid=sub_9&free=true", SUCCESS_URL)
    );
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn mixed_order_bills_only_paid_services() {
    let app = TestApp::new();

    let response = app.get("/checkout?sid=sub_9&services=KDPPREP,COVER").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), SESSION_URL);
    let request = app.provider.last_request();
    assert_eq!(request.line_items.len(), 1);
    assert_eq!(request.line_items[0].price_ref, "price_cov");
    // Free code still appears in reconciliation metadata.
    assert_eq!(request.metadata.service_codes, "KDPPREP,COVER");
}

// ==================== Validation failures ====================

#[tokio::test]
async fn missing_submission_id_is_rejected_without_provider_call() {
    let app = TestApp::new();

    let response = app.get("/checkout?services=INTFMT").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Missing submission ID (sid parameter)");
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn overlong_submission_id_is_rejected() {
    let app = TestApp::new();

    let sid = "s".repeat(201);
    let response = app
        .get(&format!("/checkout?sid={}&services=INTFMT", sid))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Invalid submission ID");
}

#[tokio::test]
async fn unknown_service_names_the_offending_token() {
    let app = TestApp::new();

    let response = app
        .get("/checkout?sid=sub_1&services=INTFMT,Foo%20Bar")
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Bad Request");
    assert!(body["message"].as_str().unwrap().contains("Foo Bar"));
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn empty_selection_is_rejected() {
    let app = TestApp::new();

    for uri in ["/checkout?sid=sub_1", "/checkout?sid=sub_1&services=%20%20"] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri {}", uri);
        let body = response_json(response).await;
        assert_eq!(body["message"], "No services selected");
    }
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn overlong_services_parameter_is_rejected() {
    let app = TestApp::new();

    let services = "X".repeat(501);
    let response = app
        .get(&format!("/checkout?sid=sub_1&services={}", services))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("too long (max 500 characters)"));
}

// ==================== Provider failures ====================

#[tokio::test]
async fn provider_failure_returns_generic_500() {
    let app = TestApp::with_failing_provider();

    let response = app.get("/checkout?sid=sub_1&services=COVER").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Internal Server Error");
    let message = body["message"].as_str().unwrap();
    // One generic message; provider detail stays in the logs.
    assert!(message.contains("Failed to start checkout"));
    assert!(!message.contains("502"));
    assert_eq!(app.provider.call_count(), 1);
}

// ==================== Transport surface ====================

#[tokio::test]
async fn health_reports_catalog_summary() {
    let app = TestApp::new();

    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "checkout-router");
    assert_eq!(body["services_configured"], 3);
    assert_eq!(body["accepts_display_text"], true);
    assert_eq!(body["fuzzy_matching"], true);
}

#[tokio::test]
async fn unknown_routes_get_json_404() {
    let app = TestApp::new();

    let response = app.get("/nope").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Not Found");
    assert_eq!(body["available_endpoints"][1], "/checkout");
}

#[tokio::test]
async fn checkout_is_rate_limited_per_client() {
    let app = TestApp::with_rate_limiter(RateLimiter::new(RateLimitConfig {
        requests_per_window: 2,
        window_duration: Duration::from_secs(60),
        enable_headers: true,
    }));

    for _ in 0..2 {
        let response = app.get("/checkout?sid=sub_1&services=COVER").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let limited = app.get("/checkout?sid=sub_1&services=COVER").await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        limited.headers().get("x-ratelimit-remaining").unwrap(),
        "0"
    );

    // Only the two allowed requests reached the provider.
    assert_eq!(app.provider.call_count(), 2);

    // Health stays reachable.
    let health = app.get("/health").await;
    assert_eq!(health.status(), StatusCode::OK);
}
