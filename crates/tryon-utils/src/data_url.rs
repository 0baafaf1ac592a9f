//! Data URL encoding and image type sniffing
//!
//! Images travel between server and client as `data:<mime>;base64,<payload>`
//! strings so the client can render them without another fetch.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::DataUrlError;

/// Mime type assumed when neither a content type nor magic bytes identify an image.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Encode bytes as a base64 data URL.
///
/// ```rust
/// use tryon_utils::data_url::encode;
///
/// assert_eq!(encode("image/png", b"hi"), "data:image/png;base64,aGk=");
/// ```
#[must_use]
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// A decoded data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Decode a base64 data URL.
///
/// # Errors
///
/// Returns [`DataUrlError`] if the text is not a base64 `data:` URL or the
/// payload is not valid base64.
pub fn decode(url: &str) -> Result<DataUrl, DataUrlError> {
    let rest = url.strip_prefix("data:").ok_or(DataUrlError::MissingScheme)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(DataUrlError::NotBase64)?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| DataUrlError::InvalidBase64(e.to_string()))?;

    Ok(DataUrl {
        mime: if mime.is_empty() {
            DEFAULT_IMAGE_MIME.to_string()
        } else {
            mime.to_string()
        },
        bytes,
    })
}

/// Identify common image formats by their magic bytes.
#[must_use]
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else {
        None
    }
}

/// Resolve the mime type of an image from an optional declared content type.
///
/// A declared `image/*` type wins; otherwise magic bytes; otherwise
/// [`DEFAULT_IMAGE_MIME`].
#[must_use]
pub fn resolve_image_mime(declared: Option<&str>, bytes: &[u8]) -> String {
    let declared = declared
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .filter(|ct| is_image_mime(ct));

    match declared {
        Some(ct) => ct.to_string(),
        None => sniff_image_mime(bytes)
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string(),
    }
}

/// Whether a mime type names an image.
#[must_use]
pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// File extension for an image mime type.
#[must_use]
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

/// Guess an image mime type from a file name's extension.
#[must_use]
pub fn mime_from_file_name(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_recovers_mime_and_bytes() {
        let url = encode("image/webp", &[1, 2, 3, 4]);
        let decoded = decode(&url).unwrap();
        assert_eq!(decoded.mime, "image/webp");
        assert_eq!(decoded.bytes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_decode_rejects_non_data_urls() {
        assert_eq!(
            decode("https://example.com/a.png"),
            Err(DataUrlError::MissingScheme)
        );
        assert_eq!(decode("data:image/png"), Err(DataUrlError::MissingPayload));
        assert_eq!(
            decode("data:text/plain,hello"),
            Err(DataUrlError::NotBase64)
        );
        assert!(matches!(
            decode("data:image/png;base64,@@@"),
            Err(DataUrlError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_sniff_known_formats() {
        assert_eq!(
            sniff_image_mime(b"\x89PNG\r\n\x1a\n...."),
            Some("image/png")
        );
        assert_eq!(sniff_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_image_mime(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_mime(b"0123456789"), None);
    }

    #[test]
    fn test_resolve_prefers_declared_image_type() {
        assert_eq!(resolve_image_mime(Some("image/jpeg"), b"xx"), "image/jpeg");
        assert_eq!(
            resolve_image_mime(Some("image/webp; charset=binary"), b"xx"),
            "image/webp"
        );
        assert_eq!(
            resolve_image_mime(Some("application/octet-stream"), b"\x89PNG\r\n\x1a\n"),
            "image/png"
        );
        assert_eq!(resolve_image_mime(None, b"0123456789"), DEFAULT_IMAGE_MIME);
    }

    #[test]
    fn test_mime_from_file_name() {
        assert_eq!(mime_from_file_name("me.JPG"), Some("image/jpeg"));
        assert_eq!(mime_from_file_name("shirt.webp"), Some("image/webp"));
        assert_eq!(mime_from_file_name("notes.txt"), None);
        assert_eq!(mime_from_file_name("noext"), None);
    }
}
