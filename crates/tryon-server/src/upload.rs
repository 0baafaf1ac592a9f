//! Multipart extraction for `POST /api/tryon`
//!
//! Enforces the upload-layer rules before any handler logic runs: image parts
//! must declare an `image/*` content type and stay within the size limit, and
//! only the known file fields are accepted, once each.

use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use bytes::{Bytes, BytesMut};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use tryon_utils::data_url::{is_image_mime, resolve_image_mime};
use tryon_utils::types::{GarmentRole, PART_CLOTHING, size_label};

/// Rejections raised while reading the multipart body. All map to 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Only image files are allowed")]
    NotAnImage,

    #[error("File size exceeds {0} limit")]
    TooLarge(String),

    #[error("Upload error: Unexpected field '{0}'")]
    UnexpectedField(String),

    #[error("Upload error: {0}")]
    Malformed(String),
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        UploadError::Malformed(e.body_text())
    }
}

/// One uploaded image part.
#[derive(Clone)]
pub struct UploadedImage {
    pub bytes: Bytes,
    pub mime: String,
    pub file_name: Option<String>,
}

impl UploadedImage {
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
            file_name: None,
        }
    }
}

impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// The parts of a try-on request.
#[derive(Debug, Clone, Default)]
pub struct TryOnUpload {
    pub person: Option<UploadedImage>,
    pub shirt: Option<UploadedImage>,
    pub pants: Option<UploadedImage>,
    /// Raw `clothing` metadata text, parsed later and best-effort.
    pub clothing: Option<String>,
}

impl TryOnUpload {
    #[must_use]
    pub fn image(&self, role: GarmentRole) -> Option<&UploadedImage> {
        match role {
            GarmentRole::Person => self.person.as_ref(),
            GarmentRole::Shirt => self.shirt.as_ref(),
            GarmentRole::Pants => self.pants.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: GarmentRole) -> &mut Option<UploadedImage> {
        match role {
            GarmentRole::Person => &mut self.person,
            GarmentRole::Shirt => &mut self.shirt,
            GarmentRole::Pants => &mut self.pants,
        }
    }

    /// The garment forwarded to synthesis: shirt if present, else pants.
    #[must_use]
    pub fn primary_garment(&self) -> Option<(GarmentRole, &UploadedImage)> {
        GarmentRole::GARMENTS
            .into_iter()
            .find_map(|role| self.image(role).map(|image| (role, image)))
    }
}

/// Read and check every part of the request.
pub async fn read_upload(
    multipart: &mut Multipart,
    max_image_bytes: usize,
) -> Result<TryOnUpload, UploadError> {
    let mut upload = TryOnUpload::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(role) = GarmentRole::from_part_name(&name) {
            if upload.image(role).is_some() {
                return Err(UploadError::UnexpectedField(name));
            }
            let image = read_image(field, max_image_bytes).await?;
            debug!(part = %name, bytes = image.bytes.len(), mime = %image.mime, "Received image part");
            *upload.slot_mut(role) = Some(image);
        } else if name == PART_CLOTHING {
            upload.clothing = Some(field.text().await?);
        } else if field.file_name().is_some() {
            return Err(UploadError::UnexpectedField(name));
        } else {
            debug!(part = %name, "Ignoring unknown text part");
        }
    }

    Ok(upload)
}

async fn read_image(mut field: Field<'_>, max_bytes: usize) -> Result<UploadedImage, UploadError> {
    let declared = field.content_type().map(str::to_string);
    if !declared.as_deref().is_some_and(is_image_mime) {
        return Err(UploadError::NotAnImage);
    }
    let file_name = field.file_name().map(str::to_string);

    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await? {
        if buf.len() + chunk.len() > max_bytes {
            return Err(UploadError::TooLarge(size_label(max_bytes)));
        }
        buf.extend_from_slice(&chunk);
    }

    let bytes = buf.freeze();
    let mime = resolve_image_mime(declared.as_deref(), &bytes);
    Ok(UploadedImage {
        bytes,
        mime,
        file_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_large_message() {
        assert_eq!(
            UploadError::TooLarge(size_label(8 * 1024 * 1024)).to_string(),
            "File size exceeds 8MB limit"
        );
    }

    #[test]
    fn test_shirt_is_preferred_over_pants() {
        let mut upload = TryOnUpload {
            pants: Some(UploadedImage::new(vec![2u8], "image/png")),
            ..Default::default()
        };
        assert_eq!(upload.primary_garment().unwrap().0, GarmentRole::Pants);

        upload.shirt = Some(UploadedImage::new(vec![1u8], "image/png"));
        assert_eq!(upload.primary_garment().unwrap().0, GarmentRole::Shirt);

        assert!(TryOnUpload::default().primary_garment().is_none());
    }
}
