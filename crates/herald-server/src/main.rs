//! Herald - campaign dispatch server entry point

use anyhow::Result;
use herald_api::AppState;
use herald_common::config::{Config, LoggingConfig};
use herald_core::{
    CampaignManager, Dispatcher, FacebookPagePoster, InstagramPoster, Maintenance, PulseWindow,
    WahaChannel,
};
use herald_storage::{DatabasePool, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting Herald dispatch server...");

    // Initialize database
    let db_pool = DatabasePool::new(&config.database).await?;
    info!("Database connection established");

    // Run migrations
    db_pool.migrate().await?;
    info!("Database migrations completed");

    let store = Store::postgres(db_pool.clone());
    let shutdown = CancellationToken::new();

    // Outbound channels
    let channel = Arc::new(WahaChannel::new(&config.gateway)?);
    let facebook = Arc::new(FacebookPagePoster::new(&config.meta)?);
    let instagram = Arc::new(InstagramPoster::new(&config.meta)?);

    let dispatcher = Dispatcher::new(store.clone(), channel)
        .with_side_channel(facebook)
        .with_side_channel(instagram)
        .with_pulse_window(PulseWindow::from(&config.dispatch))
        .with_shutdown(shutdown.clone());
    let manager = CampaignManager::new(dispatcher);

    // Background maintenance
    let maintenance = Maintenance::new(
        store,
        Duration::from_secs(config.dispatch.reconcile_interval_secs),
        shutdown.clone(),
    );
    let reset_handle = tokio::spawn(maintenance.clone().run_daily_reset());
    let sweep_handle = tokio::spawn(maintenance.run_reconcile_sweep());

    // Start API server
    let api_handle = {
        let app = herald_api::create_router(
            AppState::new(manager, Some(db_pool)),
            &config.api.cors_origins,
        );
        let addr = format!("{}:{}", config.server.bind_address, config.api.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("Starting API server on {}", addr);

        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
            {
                tracing::error!("API server error: {}", e);
            }
        })
    };

    info!("Herald server started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Workers stop before their next target; campaigns stay RUNNING for the sweep
    shutdown.cancel();

    let _ = api_handle.await;
    let _ = reset_handle.await;
    let _ = sweep_handle.await;

    info!("Herald server shutdown complete");

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},herald=debug", config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_level(true))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
