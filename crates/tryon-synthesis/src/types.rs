//! Core types for the synthesis abstraction

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

use tryon_utils::data_url;
use tryon_utils::error::SynthesisError;
use tryon_utils::types::GarmentRole;

/// An image buffer with its mime type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Bytes,
    pub mime: String,
}

impl ImageInput {
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Image payloads are large; only their size is interesting in logs.
impl fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageInput")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Input to one synthesis: a person photo and exactly one garment.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub person: ImageInput,
    pub garment: ImageInput,
    pub garment_role: GarmentRole,
    /// Optional hint such as `"red t-shirt"`.
    pub description: Option<String>,
}

impl SynthesisRequest {
    #[must_use]
    pub fn new(person: ImageInput, garment: ImageInput, garment_role: GarmentRole) -> Self {
        Self {
            person,
            garment,
            garment_role,
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }
}

/// Normalized result of one synthesis.
#[derive(Clone, PartialEq, Eq)]
pub struct SynthesizedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl SynthesizedImage {
    #[must_use]
    pub fn to_data_url(&self) -> String {
        data_url::encode(&self.mime, &self.bytes)
    }
}

impl fmt::Debug for SynthesizedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesizedImage")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The shapes a synthesis service may answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutput {
    /// Image bytes in the response itself.
    Inline { bytes: Vec<u8>, mime: Option<String> },
    /// Absolute URL to fetch the image from.
    Url(String),
    /// Service-relative file path, fetched through [`SynthesisService::file_url`].
    Path(String),
    /// Anything else; `summary` describes what was received.
    Unrecognized { summary: String },
}

/// A file downloaded by [`SynthesisService::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Raw failure reported by a synthesis service, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceFailure {
    /// HTTP status, when the service answered at all.
    pub status: Option<u16>,
    pub message: String,
    /// The transport gave up waiting.
    pub timed_out: bool,
}

impl ServiceFailure {
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            timed_out: false,
        }
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            timed_out: false,
        }
    }

    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            timed_out: true,
        }
    }
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "status {status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// The external synthesis capability.
///
/// Implementations report raw outcomes; classification into
/// [`SynthesisError`] and response normalization happen in
/// [`SynthesisInvoker`](crate::SynthesisInvoker).
#[async_trait]
pub trait SynthesisService: Send + Sync {
    /// Composite the garment onto the person photo.
    async fn synthesize(&self, request: &SynthesisRequest)
    -> Result<SynthesisOutput, ServiceFailure>;

    /// Download a result file.
    async fn fetch(&self, url: &str) -> Result<FetchedFile, ServiceFailure>;

    /// Absolute URL of a service-relative result path.
    fn file_url(&self, path: &str) -> String;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        "synthesis"
    }
}

/// Anything that turns a [`SynthesisRequest`] into an image or a typed error.
///
/// Implemented by the invoker and by wrappers around it such as
/// [`RetryCoordinator`](crate::RetryCoordinator).
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest)
    -> Result<SynthesizedImage, SynthesisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_description_is_dropped() {
        let person = ImageInput::new(vec![1u8], "image/png");
        let garment = ImageInput::new(vec![2u8], "image/png");
        let request = SynthesisRequest::new(person.clone(), garment.clone(), GarmentRole::Shirt)
            .with_description("  ");
        assert!(request.description.is_none());

        let request =
            SynthesisRequest::new(person, garment, GarmentRole::Shirt).with_description("red shirt");
        assert_eq!(request.description.as_deref(), Some("red shirt"));
    }

    #[test]
    fn test_debug_hides_payload() {
        let image = ImageInput::new(vec![7u8; 1000], "image/png");
        let text = format!("{image:?}");
        assert!(text.contains("len: 1000"));
        assert!(!text.contains("7, 7"));
    }

    #[test]
    fn test_synthesized_image_data_url() {
        let image = SynthesizedImage {
            bytes: b"hi".to_vec(),
            mime: "image/png".to_string(),
        };
        assert_eq!(image.to_data_url(), "data:image/png;base64,aGk=");
    }
}
