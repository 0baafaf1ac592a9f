//! HTTP try-on endpoint
//!
//! `POST /api/tryon` accepts a multipart upload (`image`, `shirt`, `pants`,
//! `clothing`), validates it, runs synthesis with retry and answers with a
//! JSON body; `GET /api/health` is a liveness probe.

pub mod handler;
pub mod router;
pub mod upload;

use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

use tryon_config::Config;
use tryon_utils::error::TryOnError;

pub use handler::TryOnRequestHandler;
pub use router::{AppState, build_router};
pub use upload::{TryOnUpload, UploadError, UploadedImage};

/// Build the application state from configuration.
#[must_use]
pub fn app_state_from_config(config: &Config) -> AppState {
    let synthesizer = tryon_synthesis::synthesizer_from_config(config);
    AppState::new(
        TryOnRequestHandler::new(synthesizer).with_max_image_bytes(config.server.max_upload_bytes),
    )
}

/// Bind and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the bind address is invalid or the listener fails.
pub async fn serve<F>(config: &Config, shutdown: F) -> Result<(), TryOnError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(addr = %local, endpoint = %config.synthesis.endpoint, "Try-on server listening");

    axum::serve(listener, build_router(app_state_from_config(config)))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Try-on server stopped");
    Ok(())
}
