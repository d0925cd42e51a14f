//! Roster Server - Main entry point

use anyhow::Result;
use roster_common::logging::{init_logging, LogConfig};
use roster_ingest::{connect_store, IngestPipeline, IngestService};
use roster_server::{config::Config, router, AppState};
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("roster-server")
        .filter_directives("roster_server=debug,roster_ingest=info,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Roster Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}",
        config.server.bind_address()
    );

    let store = connect_store(&config.ingest, &config.database).await?;
    let service = IngestService::new(IngestPipeline::from_config(&config.ingest, store));

    let state = AppState {
        ingest: service.clone(),
        default_path: config.ingest.file_path.clone(),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    if service.tracker().is_running() {
        warn!("Shutting down with an ingest run in progress; its current batch is rolled back");
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
