//! GridSync Suppression Sync - scheduled suppression-list drain.
//!
//! This binary:
//! 1. Pulls the vendor's suppression lists for every enabled account
//! 2. Marks each listed email as globally unsubscribed locally
//! 3. Deletes the entries from the vendor side
//!
//! By default it runs a single pass and exits, for use under an
//! external scheduler (daily cron). With
//! SUPPRESSION_SYNC_INTERVAL_SECS set it stays up and repeats on that
//! interval.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gridsync::suppression::run_sync;
use gridsync::{Config, Store, VendorClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("suppression_job_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        interval_secs = config.sync_interval_secs,
        vendor_api_base = %config.vendor_api_base,
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

    let vendor = VendorClient::new(
        &config.vendor_api_base,
        Duration::from_millis(config.request_timeout_ms),
    )
    .context("Failed to build vendor API client")?;

    if config.sync_interval_secs == 0 {
        // Single pass, external scheduler owns the cadence
        run_sync(&store, &vendor).await?;
        info!("suppression_job_complete");
        return Ok(());
    }

    // Daemon mode: repeat on the configured interval until shutdown
    let mut ticker = tokio::time::interval(Duration::from_secs(config.sync_interval_secs));

    let shutdown = async {
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
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("suppression_job_stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = run_sync(&store, &vendor).await {
                    error!(error = %e, "suppression_sync_failed");
                }
            }
        }
    }

    info!("suppression_job_shutdown_complete");
    Ok(())
}
