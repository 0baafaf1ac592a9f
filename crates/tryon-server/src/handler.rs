//! Try-on request orchestration
//!
//! Validates an extracted [`TryOnUpload`], forwards the person image and one
//! garment to the synthesis stack, and maps every outcome to a status code
//! and [`TryOnResponseBody`]. No error escapes this layer.

use axum::http::StatusCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Instrument, debug, error, info, warn};

use tryon_error_redaction::redact_error_message_for_logging;
use tryon_synthesis::{ImageInput, SynthesisRequest, Synthesizer};
use tryon_utils::data_url::{encode, is_image_mime};
use tryon_utils::error::{ErrorKind, SynthesisError};
use tryon_utils::logging::tryon_span;
use tryon_utils::types::{ClothingSelection, MAX_IMAGE_BYTES, TryOnResponseBody, size_label};

use crate::upload::{TryOnUpload, UploadError};

pub const NO_PERSON_MESSAGE: &str = "No model image uploaded";
pub const NO_GARMENT_MESSAGE: &str = "Please upload at least one garment (shirt or pants)";
pub const AUTH_CONFIG_MESSAGE: &str = "API configuration error. Please contact support.";
pub const TIMEOUT_RESPONSE_MESSAGE: &str =
    "The AI model took too long to respond. Please try again.";
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while generating your outfit";

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Server-side orchestration of one try-on request.
#[derive(Clone)]
pub struct TryOnRequestHandler {
    synthesizer: Arc<dyn Synthesizer>,
    max_image_bytes: usize,
}

impl TryOnRequestHandler {
    #[must_use]
    pub fn new(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self {
            synthesizer,
            max_image_bytes: MAX_IMAGE_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    #[must_use]
    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Handle one extracted upload.
    pub async fn handle(&self, upload: TryOnUpload) -> (StatusCode, TryOnResponseBody) {
        let request_id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        self.handle_inner(upload)
            .instrument(tryon_span(request_id))
            .await
    }

    async fn handle_inner(&self, upload: TryOnUpload) -> (StatusCode, TryOnResponseBody) {
        let request = match self.validate(&upload) {
            Ok(request) => request,
            Err(error) => {
                info!(error = %error.message(), "Rejected try-on request");
                return error_response(&error);
            }
        };

        info!(
            garment_role = %request.garment_role,
            person_bytes = request.person.len(),
            garment_bytes = request.garment.len(),
            described = request.description.is_some(),
            "Processing try-on request"
        );

        match self.synthesizer.synthesize(&request).await {
            Ok(image) => {
                let original = encode(&request.person.mime, &request.person.bytes);
                (
                    StatusCode::OK,
                    TryOnResponseBody::success(original, image.to_data_url()),
                )
            }
            Err(error) => error_response(&error),
        }
    }

    fn validate(&self, upload: &TryOnUpload) -> Result<SynthesisRequest, SynthesisError> {
        let person = upload
            .person
            .as_ref()
            .ok_or_else(|| SynthesisError::Validation(NO_PERSON_MESSAGE.to_string()))?;

        let (role, garment) = upload
            .primary_garment()
            .ok_or_else(|| SynthesisError::Validation(NO_GARMENT_MESSAGE.to_string()))?;

        let description = upload.clothing.as_deref().and_then(parse_clothing);

        if person.bytes.len() > self.max_image_bytes {
            return Err(SynthesisError::Validation(format!(
                "Model image size must be less than {}",
                size_label(self.max_image_bytes)
            )));
        }

        for image in [person, garment] {
            if !is_image_mime(&image.mime) {
                return Err(SynthesisError::Validation(
                    UploadError::NotAnImage.to_string(),
                ));
            }
            if image.bytes.len() > self.max_image_bytes {
                return Err(SynthesisError::Validation(
                    UploadError::TooLarge(size_label(self.max_image_bytes)).to_string(),
                ));
            }
        }

        let request = SynthesisRequest::new(
            ImageInput::new(person.bytes.clone(), person.mime.clone()),
            ImageInput::new(garment.bytes.clone(), garment.mime.clone()),
            role,
        );
        Ok(match description {
            Some(description) => request.with_description(description),
            None => request,
        })
    }
}

/// Best-effort parse of the `clothing` part into a description.
fn parse_clothing(text: &str) -> Option<String> {
    match serde_json::from_str::<ClothingSelection>(text) {
        Ok(selection) if !selection.is_empty() => Some(selection.describe()),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "Ignoring unparseable clothing metadata");
            None
        }
    }
}

/// Map a typed failure to the endpoint's status code and body.
#[must_use]
pub fn error_response(error: &SynthesisError) -> (StatusCode, TryOnResponseBody) {
    let kind = error.kind();
    let status =
        StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = match kind {
        ErrorKind::Validation => error.message().to_string(),
        ErrorKind::AuthConfig => {
            error!(
                error = %redact_error_message_for_logging(error.message()),
                "Synthesis service is misconfigured"
            );
            AUTH_CONFIG_MESSAGE.to_string()
        }
        ErrorKind::Timeout => {
            warn!("Synthesis timed out");
            TIMEOUT_RESPONSE_MESSAGE.to_string()
        }
        ErrorKind::RateLimited | ErrorKind::ServiceLoading => {
            warn!(kind = %kind, "Synthesis service unavailable");
            error.message().to_string()
        }
        ErrorKind::Unknown => {
            error!(
                error = %redact_error_message_for_logging(error.message()),
                "Synthesis failed"
            );
            if error.message().trim().is_empty() {
                GENERIC_FAILURE_MESSAGE.to_string()
            } else {
                error.message().to_string()
            }
        }
    };

    (status, TryOnResponseBody::failure(message))
}

impl From<UploadError> for SynthesisError {
    fn from(e: UploadError) -> Self {
        SynthesisError::Validation(e.to_string())
    }
}
