use std::{net::IpAddr, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use checkout_router as api;
use checkout_router::rate_limiter::{RateLimitConfig, RateLimiter};
use checkout_router::stripe::StripeClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    // Catalog invariants (unique codes, unambiguous display names) are
    // checked here so a bad configuration fails startup, not a request.
    let catalog = Arc::new(cfg.build_catalog().context("invalid service catalog")?);

    let provider = Arc::new(StripeClient::new(
        cfg.stripe_secret_key.clone(),
        cfg.stripe_api_base.clone(),
    )?);

    let checkout = Arc::new(api::checkout::CheckoutService::new(
        catalog.clone(),
        provider,
        cfg.max_services_len,
        cfg.max_services,
        cfg.success_url.clone(),
        cfg.cancel_url.clone(),
    ));

    let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        requests_per_window: cfg.rate_limit.requests_per_window,
        window_duration: Duration::from_secs(cfg.rate_limit.window_seconds),
        enable_headers: cfg.rate_limit.enable_headers,
    }));

    // Evict expired per-client windows so the limiter map stays bounded.
    tokio::spawn(api::rate_limiter::start_cleanup_task(
        limiter.clone(),
        Duration::from_secs(60),
    ));

    let state = api::AppState {
        checkout,
        catalog: catalog.clone(),
    };

    let app = api::app_router(state, Some(limiter))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(TraceLayer::new_for_http());

    let host: IpAddr = cfg.host.parse().context("invalid host address")?;
    let addr = SocketAddr::from((host, cfg.port));
    info!("🚀 checkout-router listening on http://{}", addr);
    info!(
        "📋 service catalog loaded with {} services",
        catalog.len()
    );
    for entry in catalog.iter() {
        info!(
            "  - {}: {}{}",
            entry.code,
            entry.display_name,
            if entry.price_ref.is_some() { "" } else { " (free)" }
        );
    }
    info!(
        "🔒 rate limiting enabled: {} requests per {}s per IP",
        cfg.rate_limit.requests_per_window, cfg.rate_limit.window_seconds
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
