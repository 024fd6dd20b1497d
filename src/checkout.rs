//! Checkout orchestration: parse the selection, build line items, then either
//! redirect straight to the thank-you page (all-free order) or create a
//! provider checkout session and redirect to its hosted URL.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::catalog::{Catalog, ServiceCode};
use crate::errors::CheckoutError;
use crate::line_items::LineItemBuilder;
use crate::parser::SelectionParser;
use crate::stripe::{CheckoutSessionProvider, CreateSessionRequest, SessionMetadata};

const MAX_SUBMISSION_ID_LEN: usize = 200;

/// Terminal outcome of one checkout request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    /// Every selected service was free; no provider interaction occurred.
    Free { url: String },
    /// A checkout session was created; redirect to its hosted URL.
    Payment { url: String },
}

impl RedirectDecision {
    pub fn url(&self) -> &str {
        match self {
            RedirectDecision::Free { url } | RedirectDecision::Payment { url } => url,
        }
    }
}

pub struct CheckoutService {
    parser: SelectionParser,
    builder: LineItemBuilder,
    provider: Arc<dyn CheckoutSessionProvider>,
    success_url: String,
    cancel_url: String,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<Catalog>,
        provider: Arc<dyn CheckoutSessionProvider>,
        max_input_len: usize,
        max_services: usize,
        success_url: String,
        cancel_url: String,
    ) -> Self {
        Self {
            parser: SelectionParser::new(catalog.clone(), max_input_len, max_services),
            builder: LineItemBuilder::new(catalog),
            provider,
            success_url,
            cancel_url,
        }
    }

    /// Run one checkout request to its terminal state.
    ///
    /// All validation happens before the provider call; the only side effect
    /// is a single session-creation request, and only on the payment path.
    pub async fn orchestrate(
        &self,
        submission_id: &str,
        raw_services: &str,
        email: Option<&str>,
    ) -> Result<RedirectDecision, CheckoutError> {
        let started = Instant::now();
        let result = self.run(submission_id, raw_services, email, started).await;
        if let Err(err) = &result {
            // Failed requests get the same duration checkpoint as completed
            // ones; the HTTP layer adds the response mapping.
            warn!(
                error = %err,
                duration_ms = started.elapsed().as_millis() as u64,
                "checkout did not complete"
            );
        }
        result
    }

    async fn run(
        &self,
        submission_id: &str,
        raw_services: &str,
        email: Option<&str>,
        started: Instant,
    ) -> Result<RedirectDecision, CheckoutError> {
        let sid = submission_id.trim();
        if sid.is_empty() {
            return Err(CheckoutError::InvalidSubmissionId(
                "Missing submission ID (sid parameter)".to_string(),
            ));
        }
        if sid.chars().count() > MAX_SUBMISSION_ID_LEN {
            return Err(CheckoutError::InvalidSubmissionId(
                "Invalid submission ID".to_string(),
            ));
        }

        info!(sid, raw = raw_services, "checkout request");

        let order = self.parser.parse(raw_services)?;
        if order.is_empty() {
            return Err(CheckoutError::NoServicesSelected);
        }

        let joined = join_codes(&order);
        info!(sid, codes = %joined, "resolved selection");

        let items = self.builder.build(&order)?;

        if items.is_empty() {
            let url = format!(
                "{}?sid={}&free=true",
                self.success_url,
                urlencoding::encode(sid)
            );
            info!(
                sid,
                duration_ms = started.elapsed().as_millis() as u64,
                "all services free, skipping provider"
            );
            return Ok(RedirectDecision::Free { url });
        }

        let request = CreateSessionRequest {
            line_items: items,
            // The provider substitutes its own session id into the template.
            success_url: format!(
                "{}?sid={}&session_id={{CHECKOUT_SESSION_ID}}",
                self.success_url,
                urlencoding::encode(sid)
            ),
            cancel_url: format!("{}?sid={}", self.cancel_url, urlencoding::encode(sid)),
            metadata: SessionMetadata {
                submission_id: sid.to_string(),
                service_codes: joined,
            },
            customer_email: email
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from),
        };

        let session = self.provider.create_session(request).await?;
        info!(
            sid,
            session_id = %session.id,
            duration_ms = started.elapsed().as_millis() as u64,
            "checkout session created"
        );

        Ok(RedirectDecision::Payment { url: session.url })
    }
}

fn join_codes(order: &[ServiceCode]) -> String {
    order
        .iter()
        .map(ServiceCode::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
