//! Network seam between the session controller and the try-on server

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use tryon_error_redaction::redact_error_message;
use tryon_utils::error::{ErrorKind, SynthesisError};
use tryon_utils::types::{GarmentRole, PART_CLOTHING, TRYON_PATH, TryOnResponseBody};

use crate::upload::ImageFile;

/// Upper bound on one try-on round trip. The server may spend two synthesis
/// attempts plus backoff on a single request.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(180);

/// One submission, built from the filled slots.
#[derive(Debug, Clone)]
pub struct TryOnRequest {
    pub person: ImageFile,
    /// Non-empty; shirt before pants.
    pub garments: Vec<(GarmentRole, ImageFile)>,
    /// JSON text sent as the `clothing` part.
    pub metadata: Option<String>,
}

/// Images returned by a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryOnResult {
    pub original_image: String,
    pub generated_image: String,
}

#[async_trait]
pub trait TryOnTransport: Send + Sync {
    /// Issue exactly one try-on request.
    async fn send(&self, request: &TryOnRequest) -> Result<TryOnResult, SynthesisError>;
}

/// [`TryOnTransport`] that posts multipart to a try-on server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns [`SynthesisError::Unknown`] if the HTTP client cannot be built.
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SynthesisError::Unknown(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}{TRYON_PATH}", server_url.trim_end_matches('/')),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn form(request: &TryOnRequest) -> Result<Form, SynthesisError> {
        let mut form = Form::new().part(
            GarmentRole::Person.part_name(),
            file_part(&request.person)?,
        );
        for (role, file) in &request.garments {
            form = form.part(role.part_name(), file_part(file)?);
        }
        if let Some(metadata) = &request.metadata {
            form = form.text(PART_CLOTHING, metadata.clone());
        }
        Ok(form)
    }
}

fn file_part(file: &ImageFile) -> Result<Part, SynthesisError> {
    Part::bytes(file.bytes.to_vec())
        .file_name(file.name.clone())
        .mime_str(&file.mime)
        .map_err(|e| SynthesisError::Validation(format!("Invalid image type '{}': {e}", file.mime)))
}

#[async_trait]
impl TryOnTransport for HttpTransport {
    async fn send(&self, request: &TryOnRequest) -> Result<TryOnResult, SynthesisError> {
        let form = Self::form(request)?;
        debug!(url = %self.url, garments = request.garments.len(), "Submitting try-on request");

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                let message = redact_error_message(&e.to_string());
                warn!(error = %message, "Try-on request failed to send");
                if e.is_timeout() {
                    SynthesisError::Timeout(format!("Request timed out: {message}"))
                } else {
                    SynthesisError::Unknown(format!("Network error: {message}"))
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        interpret_response(status, &body)
    }
}

/// Turn the server's answer into a result or a typed failure.
pub(crate) fn interpret_response(
    status: StatusCode,
    body: &str,
) -> Result<TryOnResult, SynthesisError> {
    let parsed = serde_json::from_str::<TryOnResponseBody>(body).ok();

    if !status.is_success() {
        let message = parsed
            .and_then(|b| b.error)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
        return Err(SynthesisError::new(
            ErrorKind::from_http_status(status.as_u16()),
            message,
        ));
    }

    let Some(body) = parsed else {
        return Err(SynthesisError::Unknown(
            "Server returned an unreadable response".to_string(),
        ));
    };

    if !body.success {
        return Err(SynthesisError::Unknown(
            body.error
                .unwrap_or_else(|| "Server reported failure without a message".to_string()),
        ));
    }

    match (body.original_image, body.generated_image) {
        (Some(original_image), Some(generated_image)) => Ok(TryOnResult {
            original_image,
            generated_image,
        }),
        _ => Err(SynthesisError::Unknown(
            "Server response is missing images".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Multipart;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;
    use tryon_utils::test_support::tiny_png;

    #[test]
    fn test_error_body_message_is_used() {
        let err = interpret_response(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"success":false,"error":"Rate limit exceeded"}"#,
        )
        .unwrap_err();
        assert_eq!(err, SynthesisError::RateLimited("Rate limit exceeded".into()));
    }

    #[test]
    fn test_unparseable_error_body_falls_back() {
        let err = interpret_response(StatusCode::BAD_GATEWAY, "<html>oops</html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.message(), "Request failed with status 502");

        let err = interpret_response(StatusCode::BAD_REQUEST, "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_success_false_with_2xx_fails() {
        let err = interpret_response(StatusCode::OK, r#"{"success":false,"error":"nope"}"#)
            .unwrap_err();
        assert_eq!(err.message(), "nope");
    }

    #[test]
    fn test_success_body() {
        let result = interpret_response(
            StatusCode::OK,
            r#"{"success":true,"originalImage":"data:image/png;base64,AA==","generatedImage":"data:image/png;base64,AQ==","message":"ok"}"#,
        )
        .unwrap();
        assert_eq!(result.generated_image, "data:image/png;base64,AQ==");
    }

    async fn echo_parts(mut multipart: Multipart) -> Json<serde_json::Value> {
        let mut names = Vec::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            names.push(field.name().unwrap_or_default().to_string());
        }
        Json(json!({
            "success": true,
            "originalImage": "data:image/png;base64,AA==",
            "generatedImage": "data:image/png;base64,AQ==",
            "message": names.join(","),
        }))
    }

    #[tokio::test]
    async fn test_posts_multipart_parts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(TRYON_PATH, post(echo_parts));
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let transport =
            HttpTransport::new(&format!("http://{addr}/"), Duration::from_secs(5)).unwrap();
        assert_eq!(transport.url(), format!("http://{addr}{TRYON_PATH}"));

        let request = TryOnRequest {
            person: ImageFile::new("me.png", "image/png", tiny_png()),
            garments: vec![(GarmentRole::Pants, ImageFile::new("p.png", "image/png", tiny_png()))],
            metadata: Some("{}".to_string()),
        };
        let result = transport.send(&request).await.unwrap();
        assert_eq!(result.original_image, "data:image/png;base64,AA==");
    }

    #[tokio::test]
    async fn test_connection_refused_is_unknown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport =
            HttpTransport::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        let request = TryOnRequest {
            person: ImageFile::new("me.png", "image/png", tiny_png()),
            garments: vec![(GarmentRole::Shirt, ImageFile::new("s.png", "image/png", tiny_png()))],
            metadata: None,
        };
        let err = transport.send(&request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.message().starts_with("Network error"));
    }
}
