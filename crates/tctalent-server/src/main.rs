// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Talent Catalog Server
//!
//! Serves the candidate portal and admin APIs and runs the periodic
//! Salesforce sync.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tctalent_core::config::Config;
use tctalent_core::drive::LocalDrive;
use tctalent_core::persistence;
use tctalent_core::salesforce::{SalesforceClient, SalesforceService, UnconfiguredSalesforce};
use tctalent_core::sync::{SfSyncWorker, SfSyncWorkerConfig};
use tctalent_server::{AppState, router};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tctalent_server=info,tctalent_core=info".into());
    let json = std::env::var("TC_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so it can set the log format
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Err(e) = dotenv {
        warn!("No .env file loaded: {}", e);
    }

    info!("Starting Talent Catalog server");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        http_addr = %config.http_addr,
        data_dir = %config.data_dir.display(),
        salesforce = config.salesforce.is_some(),
        "Configuration loaded"
    );

    // Connect to database (runs migrations)
    let persistence = persistence::connect(&config.database_url).await?;
    info!("Database connection established");

    let drive = Arc::new(LocalDrive::new(config.data_dir.join("drive")));

    let salesforce: Arc<dyn SalesforceService> = match config.salesforce.clone() {
        Some(sf_config) => Arc::new(SalesforceClient::new(sf_config)?),
        None => {
            warn!("Salesforce is not configured, opportunity features are disabled");
            Arc::new(UnconfiguredSalesforce)
        }
    };

    let state = AppState::new(persistence, salesforce, drive, &config.jwt_secret);

    // Start the sync worker
    let worker_handle = config.sf_sync_interval.map(|interval| {
        let worker = SfSyncWorker::new(state.sf_sync.clone(), SfSyncWorkerConfig { interval });
        let shutdown = worker.shutdown_handle();
        let handle = tokio::spawn(async move { worker.run().await });
        (shutdown, handle)
    });
    if worker_handle.is_none() {
        info!("Salesforce sync worker disabled");
    }

    // Serve until ctrl-c
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "HTTP server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down...");
        })
        .await?;

    if let Some((shutdown, handle)) = worker_handle {
        shutdown.notify_one();
        if let Err(e) = handle.await {
            error!("Sync worker task failed: {}", e);
        }
    }

    info!("Shutdown complete");
    Ok(())
}
