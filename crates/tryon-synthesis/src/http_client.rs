//! Shared HTTP client for the synthesis service
//!
//! One `reqwest::Client` is configured per process and reused by every
//! service instance, so connections to the model host are pooled.

use once_cell::sync::OnceCell;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;
use tryon_error_redaction::redact_error_message_for_logging;

use tryon_utils::error::SynthesisError;

use crate::types::ServiceFailure;

/// Connect timeout for the model host
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body kept from a failed response
const MAX_ERROR_BODY: usize = 512;

static SHARED_CLIENT: OnceCell<Client> = OnceCell::new();

/// Handle to the process-wide HTTP client.
#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Get the shared client, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError::AuthConfig` if the client cannot be constructed.
    pub fn shared() -> Result<Self, SynthesisError> {
        let client = SHARED_CLIENT.get_or_try_init(|| {
            Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(10)
                .build()
                .map_err(|e| {
                    SynthesisError::AuthConfig(format!("Failed to build HTTP client: {e}"))
                })
        })?;

        Ok(Self {
            client: client.clone(),
        })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Send a request, turning transport failures and non-2xx answers into
    /// [`ServiceFailure`]s.
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
        service: &str,
    ) -> Result<Response, ServiceFailure> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_failure(&e, service))?;

        let status = response.status();
        debug!(service = service, status = status.as_u16(), "Synthesis HTTP response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ServiceFailure::http(status.as_u16(), error_message(status, &body)))
    }
}

fn transport_failure(error: &reqwest::Error, service: &str) -> ServiceFailure {
    let message = format!(
        "{service} request failed: {}",
        redact_error_message_for_logging(&error.to_string())
    );
    if error.is_timeout() {
        ServiceFailure::timeout(message)
    } else {
        match error.status() {
            Some(status) => ServiceFailure::http(status.as_u16(), message),
            None => ServiceFailure::transport(message),
        }
    }
}

/// Pick the most useful message out of an error response body.
///
/// JSON bodies of the form `{"error": "..."}` yield the error text; anything
/// else is used verbatim, falling back to the status reason.
pub(crate) fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));

    let text = match from_json {
        Some(text) => text,
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        None => body.trim().to_string(),
    };

    let mut text = redact_error_message_for_logging(&text);
    if text.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}
