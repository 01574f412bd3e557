//! Signal handling for graceful server shutdown.

use tokio::signal;
use tracing::info;

/// Waits for a termination signal.
///
/// Handles SIGINT and SIGTERM on Unix and Ctrl+C on Windows.
///
/// # Returns
///
/// `Ok(())` when a shutdown signal is received, or an error if signal
/// handling setup failed.
pub async fn wait_for_shutdown_signal() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("📡 Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("📡 Received SIGTERM");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("📡 Received Ctrl+C");
    }

    Ok(())
}
