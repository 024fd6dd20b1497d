//! Checkout Router Library
//!
//! Stateless redirector from intake-form service selections to Stripe
//! Checkout sessions. The core pipeline is catalog -> selection parser ->
//! line-item builder -> checkout orchestrator; the HTTP layer is a thin
//! wrapper over it.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod line_items;
pub mod parser;
pub mod rate_limiter;
pub mod stripe;

pub use handlers::{app_router, AppState};
