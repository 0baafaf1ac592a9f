//! `tryon submit`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use tryon_client::{
    ClientUploadState, DEFAULT_CLIENT_TIMEOUT, GenerationSessionState, HttpTransport, ImageFile,
    SubmitOutcome, TryOnSessionController,
};
use tryon_config::Config;
use tryon_utils::error::{SynthesisError, TryOnError};
use tryon_utils::types::{ClothingSelection, GarmentRole};

/// Files named on the command line.
#[derive(Debug, Clone)]
pub struct SubmitPaths {
    pub person: PathBuf,
    pub shirt: Option<PathBuf>,
    pub pants: Option<PathBuf>,
    pub out: PathBuf,
}

/// Submit once and write the generated image into `paths.out`.
pub async fn execute_submit_command(
    config: &Config,
    paths: &SubmitPaths,
    clothing: Option<&str>,
) -> Result<()> {
    let transport = HttpTransport::new(&config.client.server_url, DEFAULT_CLIENT_TIMEOUT)
        .map_err(TryOnError::from)?;
    let controller = TryOnSessionController::new(ClientUploadState::new(), Arc::new(transport));

    select(&controller, GarmentRole::Person, Some(&paths.person)).await?;
    select(&controller, GarmentRole::Shirt, paths.shirt.as_deref()).await?;
    select(&controller, GarmentRole::Pants, paths.pants.as_deref()).await?;

    controller.set_clothing(clothing.and_then(parse_clothing));

    info!(server = %config.client.server_url, "Submitting to try-on server");
    let outcome = controller.submit().await.map_err(TryOnError::from)?;

    match outcome {
        SubmitOutcome::Finished(GenerationSessionState::Succeeded(_)) => {}
        SubmitOutcome::Finished(GenerationSessionState::Failed(error)) => {
            return Err(TryOnError::from(error).into());
        }
        other => {
            return Err(TryOnError::from(SynthesisError::Unknown(format!(
                "submission did not complete: {other:?}"
            )))
            .into());
        }
    }

    let Some(download) = controller.download().map_err(TryOnError::from)? else {
        return Err(TryOnError::from(SynthesisError::Unknown(
            "no generated image to save".to_string(),
        ))
        .into());
    };

    tokio::fs::create_dir_all(&paths.out)
        .await
        .with_context(|| format!("Failed to create {}", paths.out.display()))?;
    let target = paths.out.join(&download.file_name);
    tokio::fs::write(&target, &download.bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;

    println!("✓ Generated image saved to {}", target.display());
    Ok(())
}

/// Parse `--clothing`; metadata that does not parse is dropped, not fatal.
fn parse_clothing(text: &str) -> Option<ClothingSelection> {
    serde_json::from_str(text)
        .inspect_err(|e| warn!(error = %e, "Ignoring --clothing, submitting without metadata"))
        .ok()
}

async fn select(
    controller: &TryOnSessionController,
    role: GarmentRole,
    path: Option<&Path>,
) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = ImageFile::from_path(path)
        .await
        .with_context(|| format!("Failed to read {} image {}", role, path.display()))?;
    controller
        .uploads()
        .select(role, file)
        .map_err(TryOnError::from)?;
    Ok(())
}
