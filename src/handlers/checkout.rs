//! `GET /checkout`: validate the submission, then 303 to Stripe Checkout or
//! straight to the thank-you page for an all-free order.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;

use super::AppState;
use crate::errors::CheckoutError;

/// Query parameters forwarded by the intake form.
#[derive(Debug, Deserialize)]
pub struct CheckoutParams {
    /// Intake submission id, echoed through success/cancel URLs and metadata.
    #[serde(default)]
    pub sid: String,
    /// Comma-separated service codes or display text.
    #[serde(default)]
    pub services: String,
    /// Optional email used to pre-fill the checkout session.
    pub email: Option<String>,
}

pub async fn start_checkout(
    State(state): State<AppState>,
    Query(params): Query<CheckoutParams>,
) -> Result<Redirect, CheckoutError> {
    let decision = state
        .checkout
        .orchestrate(&params.sid, &params.services, params.email.as_deref())
        .await?;

    // Redirect::to issues a 303 See Other, as the provider expects.
    Ok(Redirect::to(decision.url()))
}
