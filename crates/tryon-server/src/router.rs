//! Router construction for the try-on server.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use tryon_utils::error::SynthesisError;
use tryon_utils::types::{HEALTH_PATH, TRYON_PATH, TryOnResponseBody};

use crate::handler::{TryOnRequestHandler, error_response};
use crate::upload::{UploadError, read_upload};

/// Room for the `clothing` part and multipart framing on top of the images.
const BODY_SLACK_BYTES: usize = 64 * 1024;

/// Shared router state.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<TryOnRequestHandler>,
}

impl AppState {
    #[must_use]
    pub fn new(handler: TryOnRequestHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

/// Build the axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // person + shirt + pants at the per-image limit
    let body_limit = state
        .handler
        .max_image_bytes()
        .saturating_mul(3)
        .saturating_add(BODY_SLACK_BYTES);

    Router::new()
        .route(TRYON_PATH, post(tryon))
        .route(HEALTH_PATH, get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn tryon(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> (StatusCode, Json<TryOnResponseBody>) {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            let error = UploadError::Malformed(rejection.body_text());
            info!(error = %error, "Rejected try-on upload");
            return reply(error_response(&SynthesisError::from(error)));
        }
    };

    let upload = match read_upload(&mut multipart, state.handler.max_image_bytes()).await {
        Ok(upload) => upload,
        Err(error) => {
            info!(error = %error, "Rejected try-on upload");
            return reply(error_response(&SynthesisError::from(error)));
        }
    };

    reply(state.handler.handle(upload).await)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn reply((status, body): (StatusCode, TryOnResponseBody)) -> (StatusCode, Json<TryOnResponseBody>) {
    (status, Json(body))
}
