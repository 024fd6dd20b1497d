//! Error taxonomy for the checkout pipeline and its HTTP mapping.
//!
//! Validation failures carry a specific, user-safe message and map to 400.
//! Provider and internal-consistency failures keep their diagnostic detail
//! for the logs but collapse to one generic 500 message so Stripe internals
//! never leak to the browser.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned for every 500-class failure.
const GENERIC_FAILURE_MESSAGE: &str =
    "Failed to start checkout. Please try again or contact support if the problem persists.";

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Raw `services` parameter exceeded the configured character bound.
    #[error("services parameter too long (max {max} characters)")]
    InputTooLong { max: usize },

    /// A token matched neither a catalog code nor a display-name prefix.
    /// Carries the offending raw token for diagnosis.
    #[error("unknown service: {token:?}")]
    UnknownService { token: String },

    /// Deduplicated selection exceeded the configured cardinality bound.
    #[error("too many services (max {max} per order)")]
    TooManyServices { max: usize },

    #[error("invalid submission id: {0}")]
    InvalidSubmissionId(String),

    #[error("no services selected")]
    NoServicesSelected,

    /// A parsed code was not found during line-item construction. The parser
    /// only emits catalog codes, so this indicates a bug, not a user error.
    #[error("unknown service code: {0}")]
    UnknownCode(String),

    /// The payment provider rejected or failed the session-creation call.
    #[error("payment session error: {0}")]
    PaymentSessionError(String),
}

impl CheckoutError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CheckoutError::InputTooLong { .. }
            | CheckoutError::UnknownService { .. }
            | CheckoutError::TooManyServices { .. }
            | CheckoutError::InvalidSubmissionId(_)
            | CheckoutError::NoServicesSelected => StatusCode::BAD_REQUEST,
            CheckoutError::UnknownCode(_) | CheckoutError::PaymentSessionError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// User-visible message: specific for validation errors, generic for
    /// provider/internal faults.
    pub fn response_message(&self) -> String {
        match self {
            CheckoutError::InputTooLong { max } => {
                format!("Services parameter too long (max {} characters)", max)
            }
            CheckoutError::UnknownService { token } => format!("Unknown service: {}", token),
            CheckoutError::TooManyServices { max } => {
                format!("Too many services (max {} per order)", max)
            }
            CheckoutError::InvalidSubmissionId(message) => message.clone(),
            CheckoutError::NoServicesSelected => "No services selected".to_string(),
            CheckoutError::UnknownCode(_) | CheckoutError::PaymentSessionError(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

/// JSON error body returned to the client.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Bad Request").
    pub error: String,
    /// Human-readable description, safe to show to the user.
    pub message: String,
    /// ISO 8601 timestamp when the error occurred.
    pub timestamp: String,
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Full detail to the logs; only response_message() reaches the client.
        if status.is_server_error() {
            tracing::error!(error = %self, "checkout failed");
        } else {
            tracing::warn!(error = %self, "checkout request rejected");
        }

        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
