//! Selection parser: raw delimited text -> ordered-unique service codes.
//!
//! Input arrives from a third-party form as either machine codes ("INTFMT")
//! or display text with formatting drift ("Cover Design — $149"). Resolution
//! is an explicit ordered rule list per token: exact code match first, then
//! one fuzzy display-name-prefix rule per catalog entry. Prefix matching (not
//! substring or edit distance) is deliberate: strict enough to avoid false
//! positives across a small known catalog, tolerant of trailing price text
//! and punctuation, the dominant real-world variation.

use std::sync::Arc;

use tracing::debug;

use crate::catalog::{normalize, Catalog, ServiceCode};
use crate::errors::CheckoutError;

pub const DEFAULT_MAX_INPUT_LEN: usize = 500;
pub const DEFAULT_MAX_SERVICES: usize = 20;

pub struct SelectionParser {
    catalog: Arc<Catalog>,
    max_input_len: usize,
    max_services: usize,
}

impl SelectionParser {
    pub fn new(catalog: Arc<Catalog>, max_input_len: usize, max_services: usize) -> Self {
        Self {
            catalog,
            max_input_len,
            max_services,
        }
    }

    /// Parse a raw selection string into a deduplicated, bounded, ordered
    /// list of catalog codes.
    ///
    /// Empty (or all-whitespace) input yields an empty order; the caller
    /// decides whether that is an error. Duplicate selections of the same
    /// service are dropped, keeping the first occurrence, before the
    /// cardinality bound is checked so resubmitting the same service never
    /// trips `TooManyServices`.
    pub fn parse(&self, raw: &str) -> Result<Vec<ServiceCode>, CheckoutError> {
        // Length bound before any other processing.
        if raw.chars().count() > self.max_input_len {
            return Err(CheckoutError::InputTooLong {
                max: self.max_input_len,
            });
        }

        let tokens: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect();
        debug!(token_count = tokens.len(), "tokenized raw selection");

        let mut order: Vec<ServiceCode> = Vec::new();
        for token in tokens {
            let code = self.resolve(token)?;
            if order.contains(&code) {
                debug!(%code, token, "dropping duplicate selection");
            } else {
                order.push(code);
            }
        }

        if order.len() > self.max_services {
            return Err(CheckoutError::TooManyServices {
                max: self.max_services,
            });
        }

        Ok(order)
    }

    /// Ordered rule list, first match wins.
    fn resolve(&self, token: &str) -> Result<ServiceCode, CheckoutError> {
        let upper = token.to_uppercase();
        if let Some(code) = self.catalog.match_exact(&upper) {
            debug!(token, %code, "matched code directly");
            return Ok(code);
        }

        let normalized = normalize(token);
        if let Some(code) = self.catalog.match_prefix(&normalized) {
            debug!(token, %normalized, %code, "matched display name prefix");
            return Ok(code);
        }

        debug!(token, %normalized, "token matched no catalog rule");
        Err(CheckoutError::UnknownService {
            token: token.to_string(),
        })
    }
}
