//! HTTP synthesis service
//!
//! Talks to a hosted try-on model: one JSON `POST` per synthesis carrying both
//! images as base64, plus optional `GET`s to download result files.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use tryon_config::Config;
use tryon_utils::data_url;
use tryon_utils::error::SynthesisError;

use crate::http_client::HttpClient;
use crate::types::{FetchedFile, ServiceFailure, SynthesisOutput, SynthesisRequest, SynthesisService};

const SERVICE_NAME: &str = "huggingface";

/// HTTP implementation of [`SynthesisService`].
#[derive(Clone)]
pub struct HttpSynthesisService {
    client: HttpClient,
    endpoint: String,
    file_base_url: String,
    api_key: String,
    request_timeout: Duration,
}

#[derive(Serialize)]
struct SynthesisPayload<'a> {
    person_image: String,
    garment_image: String,
    garment_role: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl HttpSynthesisService {
    /// Create a service for an explicit endpoint and key.
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError::AuthConfig` if the key is blank or the HTTP
    /// client cannot be constructed.
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        file_base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, SynthesisError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SynthesisError::AuthConfig(
                "synthesis API key is empty".to_string(),
            ));
        }

        Ok(Self {
            client: HttpClient::shared()?,
            endpoint: endpoint.into(),
            file_base_url: file_base_url.into().trim_end_matches('/').to_string(),
            api_key,
            request_timeout,
        })
    }

    /// Create a service from configuration
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError::AuthConfig` if the API key environment
    /// variable named by `[synthesis] api_key_env` is not set.
    pub fn new_from_config(config: &Config) -> Result<Self, SynthesisError> {
        let api_key_env = &config.synthesis.api_key_env;
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SynthesisError::AuthConfig(format!("{api_key_env} is not configured")))?;

        Self::new(
            api_key,
            config.synthesis.endpoint.clone(),
            config.file_base_url(),
            config.synthesis_timeout(),
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.api_key)
    }

    /// Whether `url` is on the file route's origin and under its base path.
    fn is_file_route(&self, url: &str) -> bool {
        let (Ok(base), Ok(target)) = (Url::parse(&self.file_base_url), Url::parse(url)) else {
            return false;
        };
        if base.scheme() != target.scheme()
            || base.host_str() != target.host_str()
            || base.port_or_known_default() != target.port_or_known_default()
        {
            return false;
        }

        let base_path = base.path().trim_end_matches('/');
        let path = target.path();
        base_path.is_empty()
            || path == base_path
            || path
                .strip_prefix(base_path)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

#[async_trait]
impl SynthesisService for HttpSynthesisService {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesisOutput, ServiceFailure> {
        let payload = SynthesisPayload {
            person_image: STANDARD.encode(&request.person.bytes),
            garment_image: STANDARD.encode(&request.garment.bytes),
            garment_role: request.garment_role.as_str(),
            description: request.description.as_deref(),
        };

        debug!(
            service = SERVICE_NAME,
            garment_role = %request.garment_role,
            person_bytes = request.person.len(),
            garment_bytes = request.garment.len(),
            "Sending synthesis request"
        );

        let builder = self
            .authorize(self.client.inner().post(&self.endpoint))
            .header("x-use-cache", "false")
            .json(&payload);

        let response = self
            .client
            .send(builder, self.request_timeout, SERVICE_NAME)
            .await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceFailure::transport(format!("failed to read response body: {e}")))?;

        interpret_response(content_type.as_deref(), &body)
    }

    async fn fetch(&self, url: &str) -> Result<FetchedFile, ServiceFailure> {
        let mut builder = self.client.inner().get(url);
        if self.is_file_route(url) {
            builder = self.authorize(builder);
        }

        let response = self
            .client
            .send(builder, self.request_timeout, SERVICE_NAME)
            .await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceFailure::transport(format!("failed to download result: {e}")))?;

        Ok(FetchedFile {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    fn file_url(&self, path: &str) -> String {
        format!("{}/file={}", self.file_base_url, path.trim_start_matches('/'))
    }

    fn name(&self) -> &'static str {
        SERVICE_NAME
    }
}

/// Interpret a successful response body.
///
/// An `image/*` body is the image itself. A JSON body is read from `data[0]`
/// when present, otherwise from the top-level value. A JSON `{"error": ...}`
/// without any result is a failure even on a 2xx status.
pub(crate) fn interpret_response(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<SynthesisOutput, ServiceFailure> {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .filter(|ct| !ct.is_empty());

    if mime.is_some_and(data_url::is_image_mime) {
        return Ok(SynthesisOutput::Inline {
            bytes: body.to_vec(),
            mime: mime.map(str::to_string),
        });
    }

    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        return interpret_json(&value);
    }

    if data_url::sniff_image_mime(body).is_some() {
        return Ok(SynthesisOutput::Inline {
            bytes: body.to_vec(),
            mime: None,
        });
    }

    Ok(SynthesisOutput::Unrecognized {
        summary: format!(
            "{} byte body with content type {}",
            body.len(),
            mime.unwrap_or("<none>")
        ),
    })
}

fn interpret_json(value: &Value) -> Result<SynthesisOutput, ServiceFailure> {
    let item = value
        .get("data")
        .and_then(|data| data.get(0))
        .unwrap_or(value);

    if let Some(output) = interpret_item(item) {
        return Ok(output);
    }

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(ServiceFailure::transport(error.to_string()));
    }

    Ok(SynthesisOutput::Unrecognized {
        summary: format!("JSON {}", json_kind(item)),
    })
}

fn interpret_item(item: &Value) -> Option<SynthesisOutput> {
    match item {
        Value::Object(map) => {
            if let Some(url) = map.get("url").and_then(Value::as_str) {
                return Some(SynthesisOutput::Url(url.to_string()));
            }
            map.get("path")
                .and_then(Value::as_str)
                .map(|path| SynthesisOutput::Path(path.to_string()))
        }
        Value::String(text) => interpret_string(text),
        _ => None,
    }
}

fn interpret_string(text: &str) -> Option<SynthesisOutput> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.starts_with("data:") {
        return match data_url::decode(text) {
            Ok(decoded) => Some(SynthesisOutput::Inline {
                bytes: decoded.bytes,
                mime: Some(decoded.mime),
            }),
            Err(e) => Some(SynthesisOutput::Unrecognized {
                summary: format!("undecodable data URL: {e}"),
            }),
        };
    }
    if text.starts_with("http://") || text.starts_with("https://") {
        return Some(SynthesisOutput::Url(text.to_string()));
    }
    Some(SynthesisOutput::Path(text.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
