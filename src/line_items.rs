//! Line-item construction: resolved service codes -> payment-request items.

use std::sync::Arc;

use tracing::debug;

use crate::catalog::{Catalog, ServiceCode};
use crate::errors::CheckoutError;

/// A priced unit sent to the payment provider. Quantity is always one; the
/// intake form offers each service at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub price_ref: String,
    pub quantity: u32,
}

pub struct LineItemBuilder {
    catalog: Arc<Catalog>,
}

impl LineItemBuilder {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Map each code to a line item, preserving order. Codes without a price
    /// reference are free services: skipped silently, never an error.
    ///
    /// `UnknownCode` is defensive; the parser only emits catalog codes, so
    /// hitting it means the parser and builder were built from different
    /// catalogs.
    pub fn build(&self, order: &[ServiceCode]) -> Result<Vec<LineItem>, CheckoutError> {
        let mut items = Vec::with_capacity(order.len());
        for code in order {
            let entry = self
                .catalog
                .get(code)
                .ok_or_else(|| CheckoutError::UnknownCode(code.as_str().to_string()))?;

            match &entry.price_ref {
                Some(price_ref) => {
                    debug!(%code, price_ref, "added line item");
                    items.push(LineItem {
                        price_ref: price_ref.clone(),
                        quantity: 1,
                    });
                }
                None => debug!(%code, "free service, no line item"),
            }
        }
        Ok(items)
    }
}
