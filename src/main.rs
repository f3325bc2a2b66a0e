//! # Coworking Server
//!
//! Reservation platform entry point. Initializes:
//! - Configuration and tracing
//! - PostgreSQL pool and migrations
//! - Token authority
//! - Outbox dispatcher and scheduler consumer workers
//! - HTTP server with graceful shutdown

use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use coworking_server::config::Settings;
use coworking_server::startup::Application;
use coworking_server::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment and config files
    let settings = Settings::load()?;

    telemetry::init_tracing(&settings.logger.level);
    info!(
        name = %settings.app.name,
        version = %settings.app.version,
        port = settings.http.port,
        environment = %settings.environment,
        "Starting coworking server"
    );

    let shutdown_timeout = Duration::from_secs(settings.http.shutdown_timeout);

    // Root cancellation scope: a process signal stops the HTTP server and
    // all background workers.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        signal_cancel.cancel();
    });

    let application = Application::build(settings).await?;
    let workers = application.spawn_workers(cancel.clone())?;

    info!("Server ready to accept connections");
    let served = application.run_until_stopped(cancel.clone()).await;

    // Also reached on a fatal server error: stop the workers either way.
    cancel.cancel();
    for worker in workers {
        if tokio::time::timeout(shutdown_timeout, worker).await.is_err() {
            tracing::warn!("worker did not stop within the shutdown deadline");
        }
    }

    info!("Shut down");
    served
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
