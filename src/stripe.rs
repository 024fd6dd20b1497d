//! Stripe Checkout session client.
//!
//! The orchestrator talks to the provider through the `CheckoutSessionProvider`
//! trait so tests can substitute a recording double; `StripeClient` is the
//! production implementation, a thin reqwest wrapper around
//! `POST /v1/checkout/sessions` (form-encoded, bearer-authenticated).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::CheckoutError;
use crate::line_items::LineItem;

const SESSION_ENDPOINT: &str = "/v1/checkout/sessions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reconciliation metadata attached to the session for the fulfillment side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    pub submission_id: String,
    /// Comma-joined resolved service codes, in order.
    pub service_codes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSessionRequest {
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: SessionMetadata,
    pub customer_email: Option<String>,
}

/// The hosted checkout session the browser is redirected to.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait CheckoutSessionProvider: Send + Sync {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, CheckoutError>;
}

pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: String, api_base: String) -> Result<Self, CheckoutError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                CheckoutError::PaymentSessionError(format!("failed to build http client: {}", e))
            })?;

        Ok(Self {
            client,
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

/// Flatten a session request into Stripe's bracketed form encoding.
fn session_form(request: &CreateSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        (
            "metadata[project_intake_submission_id]".to_string(),
            request.metadata.submission_id.clone(),
        ),
        (
            "metadata[selected_service_skus]".to_string(),
            request.metadata.service_codes.clone(),
        ),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        form.push((format!("line_items[{}][price]", i), item.price_ref.clone()));
        form.push((
            format!("line_items[{}][quantity]", i),
            item.quantity.to_string(),
        ));
    }

    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }

    form
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[async_trait]
impl CheckoutSessionProvider for StripeClient {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        let endpoint = format!("{}{}", self.api_base, SESSION_ENDPOINT);
        debug!(
            line_items = request.line_items.len(),
            submission_id = %request.metadata.submission_id,
            "creating checkout session"
        );

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.secret_key)
            .form(&session_form(&request))
            .send()
            .await
            .map_err(|e| {
                CheckoutError::PaymentSessionError(format!("session request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "provider rejected session creation");
            return Err(CheckoutError::PaymentSessionError(format!(
                "provider returned {}",
                status
            )));
        }

        let session: SessionResponse = response.json().await.map_err(|e| {
            CheckoutError::PaymentSessionError(format!("invalid session response: {}", e))
        })?;

        let url = session.url.ok_or_else(|| {
            CheckoutError::PaymentSessionError(format!(
                "session {} has no hosted url",
                session.id
            ))
        })?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}
