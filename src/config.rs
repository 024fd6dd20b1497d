//! Application configuration and tracing setup.
//!
//! Configuration layers, in order: built-in defaults, `config/default.toml`,
//! `config/{env}.toml`, then `APP__*` environment variables. The Stripe
//! secret key and the success/cancel URLs have no defaults and must be
//! provided explicitly.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationErrors};

use crate::catalog::{Catalog, CatalogEntry, CatalogError};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 3000;
const CONFIG_DIR: &str = "config";
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_MAX_SERVICES_LEN: usize = 500;
const DEFAULT_MAX_SERVICES: usize = 20;
const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 100;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 900;

/// Rate limiting settings for the checkout endpoint.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RateLimitSettings {
    #[serde(default = "default_rate_limit_requests")]
    pub requests_per_window: u32,

    #[serde(default = "default_rate_limit_window_secs")]
    pub window_seconds: u64,

    /// Emit X-RateLimit-* headers on limited responses.
    #[serde(default = "default_true")]
    pub enable_headers: bool,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_window: default_rate_limit_requests(),
            window_seconds: default_rate_limit_window_secs(),
            enable_headers: true,
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Stripe secret key; never defaulted, never logged.
    #[validate(length(min = 1))]
    pub stripe_secret_key: String,

    /// Stripe API base URL (overridden in tests to point at a mock server).
    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,

    /// Browser destination after a completed (or all-free) checkout.
    #[validate(url)]
    pub success_url: String,

    /// Browser destination after a cancelled checkout.
    #[validate(url)]
    pub cancel_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Maximum character count of the raw `services` parameter.
    #[validate(range(min = 1, max = 10000))]
    #[serde(default = "default_max_services_len")]
    pub max_services_len: usize,

    /// Maximum number of distinct services per order.
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_max_services")]
    pub max_services: usize,

    #[serde(default)]
    #[validate]
    pub rate_limit: RateLimitSettings,

    /// Service catalog entries; defaults mirror the live offering.
    #[serde(default = "default_catalog")]
    pub catalog: Vec<CatalogEntry>,
}

impl AppConfig {
    /// Validate catalog invariants and build the immutable catalog value.
    /// Called once at startup so ambiguous catalogs fail fast, not per
    /// request.
    pub fn build_catalog(&self) -> Result<Catalog, CatalogError> {
        Catalog::from_entries(self.catalog.clone())
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_stripe_api_base() -> String {
    DEFAULT_STRIPE_API_BASE.to_string()
}

fn default_max_services_len() -> usize {
    DEFAULT_MAX_SERVICES_LEN
}

fn default_max_services() -> usize {
    DEFAULT_MAX_SERVICES
}

fn default_rate_limit_requests() -> u32 {
    DEFAULT_RATE_LIMIT_REQUESTS
}

fn default_rate_limit_window_secs() -> u64 {
    DEFAULT_RATE_LIMIT_WINDOW_SECS
}

fn default_true() -> bool {
    true
}

/// The live service catalog, used when no `catalog` section is configured.
fn default_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            code: "INTFMT".to_string(),
            display_name: "Interior Formatting".to_string(),
            price_ref: Some("price_1Sku587uZCk6xNoP3Kmujdxi".to_string()),
        },
        CatalogEntry {
            code: "COVER".to_string(),
            display_name: "Cover Design".to_string(),
            price_ref: Some("price_1Sku677uZCk6xNoP7kwzbTKE".to_string()),
        },
        CatalogEntry {
            code: "KDPPREP".to_string(),
            display_name: "KDP Upload Preparation".to_string(),
            price_ref: Some("price_1Sku787uZCk6xNoP7PbsdNnw".to_string()),
        },
    ]
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(ValidationErrors),
}

/// Load the application configuration.
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let builder = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("stripe_api_base", DEFAULT_STRIPE_API_BASE)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // NOTE: the Stripe key has no default so a misconfigured deployment can
    // never silently run against a placeholder account. Check it up front to
    // give a clear error message.
    if config.get_string("stripe_secret_key").is_err() {
        error!("Stripe secret key is not configured. Set APP__STRIPE_SECRET_KEY.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "stripe_secret_key is required but not configured. Set APP__STRIPE_SECRET_KEY.".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("checkout_router={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}
