//! Shared test harness: an in-process router wired to a recording payment
//! provider double.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response, Router};
use tower::ServiceExt;

use checkout_router::catalog::{Catalog, CatalogEntry};
use checkout_router::checkout::CheckoutService;
use checkout_router::errors::CheckoutError;
use checkout_router::rate_limiter::RateLimiter;
use checkout_router::stripe::{CheckoutSession, CheckoutSessionProvider, CreateSessionRequest};
use checkout_router::{app_router, AppState};

pub const SESSION_URL: &str = "https://checkout.stripe.com/c/pay/cs_test_123";
pub const SUCCESS_URL: &str = "https://example.com/thanks";
pub const CANCEL_URL: &str = "https://example.com/services";

/// Payment provider double that records every session request and answers
/// with a canned session (or a canned failure).
pub struct RecordingProvider {
    pub calls: Mutex<Vec<CreateSessionRequest>>,
    fail: bool,
}

impl RecordingProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_request(&self) -> CreateSessionRequest {
        self.calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("provider was never called")
    }
}

#[async_trait]
impl CheckoutSessionProvider for RecordingProvider {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        self.calls.lock().unwrap().push(request);
        if self.fail {
            return Err(CheckoutError::PaymentSessionError(
                "provider returned 502 Bad Gateway".to_string(),
            ));
        }
        Ok(CheckoutSession {
            id: "cs_test_123".to_string(),
            url: SESSION_URL.to_string(),
        })
    }
}

/// Catalog used by the integration tests: two paid services, one free.
pub fn test_catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::from_entries(vec![
            CatalogEntry {
                code: "INTFMT".into(),
                display_name: "Interior Formatting".into(),
                price_ref: Some("price_int".into()),
            },
            CatalogEntry {
                code: "COVER".into(),
                display_name: "Cover Design".into(),
                price_ref: Some("price_cov".into()),
            },
            CatalogEntry {
                code: "KDPPREP".into(),
                display_name: "KDP Upload Preparation".into(),
                price_ref: None,
            },
        ])
        .unwrap(),
    )
}

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<RecordingProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(RecordingProvider::new(), None)
    }

    pub fn with_failing_provider() -> Self {
        Self::with_options(RecordingProvider::failing(), None)
    }

    pub fn with_rate_limiter(limiter: RateLimiter) -> Self {
        Self::with_options(RecordingProvider::new(), Some(Arc::new(limiter)))
    }

    fn with_options(provider: Arc<RecordingProvider>, limiter: Option<Arc<RateLimiter>>) -> Self {
        let catalog = test_catalog();
        let checkout = Arc::new(CheckoutService::new(
            catalog.clone(),
            provider.clone(),
            500,
            20,
            SUCCESS_URL.to_string(),
            CANCEL_URL.to_string(),
        ));
        let state = AppState { checkout, catalog };
        Self {
            router: app_router(state, limiter),
            provider,
        }
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response")
    }
}

pub async fn response_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .expect("location header")
        .to_str()
        .expect("ascii location")
        .to_string()
}
