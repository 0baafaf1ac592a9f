//! `tryon serve`

use anyhow::Result;
use tracing::info;

use tryon_config::Config;

/// Run the server until Ctrl-C.
pub async fn execute_serve_command(config: &Config) -> Result<()> {
    tryon_server::serve(config, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        // Without a signal handler the server runs until the process is killed.
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
