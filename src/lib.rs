//! tryon - virtual try-on request orchestration
//!
//! A person photo and one or more garment images go in, a composited image
//! produced by a remote generative model comes out. The workspace splits the
//! pipeline into:
//!
//! - [`tryon_server`]: the `POST /api/tryon` endpoint (validation, synthesis
//!   with retry, status mapping)
//! - [`tryon_synthesis`]: the synthesis service seam, timeout, response
//!   normalization, error classification and retry
//! - [`tryon_client`]: upload slots with previews and the submission state
//!   machine
//! - [`tryon_config`]: layered configuration with source attribution
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! export HUGGINGFACE_API_KEY=hf_...
//! tryon serve
//! tryon submit --person me.jpg --shirt shirt.png --out ./results
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use tryon::{Config, build_router, app_state_from_config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::builder().max_retries(2).build()?;
//! let router = build_router(app_state_from_config(&config));
//! # let _ = router;
//! # Ok(())
//! # }
//! ```

pub mod cli;

pub use tryon_client::{
    ClientUploadState, Download, GenerationSessionState, HttpTransport, ImageFile,
    SubmitOutcome, TryOnRequest, TryOnResult, TryOnSessionController, TryOnTransport,
    UploadSlot,
};
pub use tryon_config::{CliArgs, Config, ConfigBuilder, ConfigSource};
pub use tryon_error_redaction::{redact_error_message, redact_error_message_for_logging};
pub use tryon_server::{
    AppState, TryOnRequestHandler, TryOnUpload, UploadedImage, app_state_from_config,
    build_router, serve,
};
pub use tryon_synthesis::{
    HttpSynthesisService, LazyServiceHandle, RetryCoordinator, RetryPolicy, SynthesisInvoker,
    SynthesisOutput, SynthesisRequest, SynthesisService, SynthesizedImage, Synthesizer,
    synthesizer_from_config, synthesizer_with_service,
};
pub use tryon_utils::error::{ConfigError, ErrorKind, SynthesisError, TryOnError};
pub use tryon_utils::exit_codes::ExitCode;
pub use tryon_utils::types::{
    ClothingItem, ClothingSelection, GarmentRole, MAX_IMAGE_BYTES, TryOnResponseBody,
};
