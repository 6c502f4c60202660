//! GridSync Web Server - vendor event webhook receiver.
//!
//! This binary:
//! 1. Authenticates inbound webhook requests with HTTP Basic credentials
//! 2. Applies each delivery event to the matching local message record
//! 3. Exposes an operator endpoint to provision the vendor webhook

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gridsync::web::{event_webhook, health, provision_account, AppState};
use gridsync::{Config, CredentialCache, Store, VendorClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        site = %config.site,
        base_url = %config.base_url,
        override_configured = config.credentials_override.is_some(),
        "config_loaded"
    );

    // Connect the local store and apply migrations
    let store = Store::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    store
        .run_migrations()
        .await
        .context("Failed to run migrations")?;
    info!("store_ready");

    // Credential cache and vendor API client
    let cache = CredentialCache::new(store.clone(), config.credentials_override.clone());
    let vendor = VendorClient::new(
        &config.vendor_api_base,
        Duration::from_millis(config.request_timeout_ms),
    )
    .context("Failed to build vendor API client")?;

    // Create application state
    let state = AppState::new(config.clone(), store, cache, vendor);

    // Build the router
    let app = Router::new()
        .route("/health", get(health))
        .route("/webhooks/events", post(event_webhook))
        .route("/accounts/:name/provision", post(provision_account))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
