use std::future::Future;

use tokio::signal;

use crate::error::{AppError, Result};

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

/// Drive `run` to completion unless `shutdown` resolves first.
///
/// When the signal wins, `run` is dropped, which releases the engine's
/// worker pool and aborts any probes still in flight.
pub async fn run_until_shutdown<T, R, S>(run: R, shutdown: S) -> Result<T>
where
    R: Future<Output = T>,
    S: Future<Output = ()>,
{
    tokio::select! {
        output = run => Ok(output),
        _ = shutdown => {
            tracing::warn!("Run interrupted before completion");
            Err(AppError::Interrupted)
        }
    }
}
