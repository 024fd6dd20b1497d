//! Per-IP rate limiting for the checkout endpoint.
//!
//! Fixed-window counting in memory (one process serves the intake flow, so
//! distributed state is unnecessary). Applied as axum middleware on the
//! checkout route only; health checks are never limited.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tracing::{debug, warn};

const LIMITED_MESSAGE: &str =
    "Too many checkout requests from this IP, please try again later.";

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_duration: Duration,
    pub enable_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_duration: Duration::from_secs(900),
            enable_headers: true,
        }
    }
}

#[derive(Debug)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Outcome of one rate-limit check, with the values the headers need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub retry_after: Duration,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    entries: DashMap<String, WindowEntry>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    /// Count one request against `key` and decide whether it may proceed.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let limit = self.config.requests_per_window;
        let window = self.config.window_duration;

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                window_start: now,
            });

        // Fixed window: reset the counter when the window expires.
        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }
        entry.count += 1;

        let allowed = entry.count <= limit;
        let remaining = limit.saturating_sub(entry.count);
        let elapsed = now.duration_since(entry.window_start);
        let retry_after = window.saturating_sub(elapsed);

        RateLimitDecision {
            allowed,
            limit,
            remaining,
            retry_after,
        }
    }

    /// Evict entries whose window has fully elapsed. Without this, every
    /// distinct client key seen (including arbitrary X-Forwarded-For values)
    /// would occupy the map forever.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let window = self.config.window_duration;
        self.entries
            .retain(|_, entry| now.duration_since(entry.window_start) < window);
    }

    /// Number of client keys currently tracked.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn headers_enabled(&self) -> bool {
        self.config.enable_headers
    }
}

/// Background cleanup task: periodically evicts expired entries so the
/// per-client map stays bounded by active clients.
pub async fn start_cleanup_task(limiter: Arc<RateLimiter>, interval: Duration) {
    let mut interval_timer = tokio::time::interval(interval);

    loop {
        interval_timer.tick().await;
        limiter.cleanup_expired();
        debug!(entries = limiter.entry_count(), "rate limiter cleanup completed");
    }
}

/// Numeric strings are always valid header values; fall back to "0" for the
/// impossible case.
fn num_to_header_value<T: ToString>(n: T) -> HeaderValue {
    HeaderValue::from_str(&n.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

/// Client key: first X-Forwarded-For hop when behind a proxy, otherwise the
/// peer address.
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    let decision = limiter.check(&key);

    if !decision.allowed {
        warn!(client = %key, "rate limit exceeded");
        let mut response =
            (StatusCode::TOO_MANY_REQUESTS, LIMITED_MESSAGE).into_response();
        if limiter.headers_enabled() {
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", num_to_header_value(decision.limit));
            headers.insert("x-ratelimit-remaining", num_to_header_value(0u32));
            headers.insert(
                "retry-after",
                num_to_header_value(decision.retry_after.as_secs().max(1)),
            );
        }
        return response;
    }

    debug!(client = %key, remaining = decision.remaining, "rate limit check passed");
    let mut response = next.run(request).await;
    if limiter.headers_enabled() {
        let headers = response.headers_mut();
        headers.insert("x-ratelimit-limit", num_to_header_value(decision.limit));
        headers.insert(
            "x-ratelimit-remaining",
            num_to_header_value(decision.remaining),
        );
    }
    response
}
