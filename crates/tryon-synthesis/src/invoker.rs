//! Single synthesis attempt with timeout, normalization and error classification

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use tryon_error_redaction::redact_error_message_for_logging;
use tryon_utils::data_url;
use tryon_utils::error::SynthesisError;

use crate::handle::LazyServiceHandle;
use crate::types::{
    ServiceFailure, SynthesisOutput, SynthesisRequest, SynthesisService, SynthesizedImage,
    Synthesizer,
};

/// Default hard limit of one attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub const TIMEOUT_MESSAGE: &str =
    "Request timed out. The model is taking too long to respond. Please try again.";
pub const LOADING_MESSAGE: &str = "Model is currently loading. Please try again in a few moments.";
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again in a minute.";
pub const UNPARSEABLE_MESSAGE: &str = "failed to parse generated image from model response";

/// Calls the synthesis service once.
///
/// The whole attempt, including any follow-up download of the result, is
/// bounded by the timeout; on expiry the in-flight call is dropped and the
/// attempt fails with [`SynthesisError::Timeout`].
pub struct SynthesisInvoker {
    handle: Arc<LazyServiceHandle>,
    timeout: Duration,
}

impl SynthesisInvoker {
    #[must_use]
    pub fn new(handle: Arc<LazyServiceHandle>, timeout: Duration) -> Self {
        Self { handle, timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(
        &self,
        service: &dyn SynthesisService,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedImage, SynthesisError> {
        let output = service.synthesize(request).await.map_err(|f| classify(&f))?;
        normalize(service, output).await
    }
}

#[async_trait]
impl Synthesizer for SynthesisInvoker {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedImage, SynthesisError> {
        let service = self.handle.get().await?;

        match tokio::time::timeout(self.timeout, self.attempt(service.as_ref(), request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    service = service.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Synthesis attempt timed out"
                );
                Err(SynthesisError::Timeout(TIMEOUT_MESSAGE.to_string()))
            }
        }
    }
}

/// Turn any service output shape into image bytes.
async fn normalize(
    service: &dyn SynthesisService,
    output: SynthesisOutput,
) -> Result<SynthesizedImage, SynthesisError> {
    let (bytes, declared) = match output {
        SynthesisOutput::Inline { bytes, mime } => (bytes, mime),
        SynthesisOutput::Url(url) => {
            debug!(service = service.name(), "Fetching result by URL");
            let file = service.fetch(&url).await.map_err(|f| classify(&f))?;
            (file.bytes, file.content_type)
        }
        SynthesisOutput::Path(path) => {
            let url = service.file_url(&path);
            debug!(service = service.name(), path = %path, "Fetching result by path");
            let file = service.fetch(&url).await.map_err(|f| classify(&f))?;
            (file.bytes, file.content_type)
        }
        SynthesisOutput::Unrecognized { summary } => {
            warn!(service = service.name(), received = %summary, "Unrecognized synthesis response");
            return Err(SynthesisError::Unknown(UNPARSEABLE_MESSAGE.to_string()));
        }
    };

    if bytes.is_empty() {
        return Err(SynthesisError::Unknown(UNPARSEABLE_MESSAGE.to_string()));
    }

    let mime = data_url::resolve_image_mime(declared.as_deref(), &bytes);
    Ok(SynthesizedImage { bytes, mime })
}

/// Message fragments that point at the API key rather than the request.
const CREDENTIAL_PHRASES: &[&str] = &[
    "api key",
    "not configured",
    "unauthorized",
    "invalid token",
    "token expired",
    "expired token",
    "access token",
    "auth token",
];

/// Classify a raw service failure.
///
/// Status codes win over message text. Messages are matched
/// case-insensitively: loading/unavailable, then rate limit/quota, then
/// credential problems.
#[must_use]
pub fn classify(failure: &ServiceFailure) -> SynthesisError {
    if failure.timed_out {
        return SynthesisError::Timeout(TIMEOUT_MESSAGE.to_string());
    }

    let message = redact_error_message_for_logging(&failure.message);

    match failure.status {
        Some(503) => return SynthesisError::ServiceLoading(LOADING_MESSAGE.to_string()),
        Some(429) => return SynthesisError::RateLimited(RATE_LIMIT_MESSAGE.to_string()),
        Some(401 | 403) => {
            return SynthesisError::AuthConfig(format!("Invalid synthesis API key: {message}"));
        }
        _ => {}
    }

    let lower = failure.message.to_lowercase();
    if lower.contains("loading") || lower.contains("unavailable") {
        SynthesisError::ServiceLoading(message)
    } else if lower.contains("rate limit") || lower.contains("quota") {
        SynthesisError::RateLimited(message)
    } else if CREDENTIAL_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        SynthesisError::AuthConfig(message)
    } else if message.trim().is_empty() {
        SynthesisError::Unknown(match failure.status {
            Some(status) => format!("synthesis service returned status {status}"),
            None => "synthesis service failed".to_string(),
        })
    } else {
        SynthesisError::Unknown(message)
    }
}
