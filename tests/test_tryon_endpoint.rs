//! End-to-end tests of the try-on endpoint
//!
//! The full server stack (router, multipart extraction, handler, retry,
//! invoker, lazy handle) runs against a scripted synthesis service; the last
//! test also drives it through the real client over TCP.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use tryon::{
    AppState, ClientUploadState, GenerationSessionState, HttpTransport, ImageFile, RetryPolicy,
    SubmitOutcome, SynthesisOutput, SynthesisRequest, SynthesisService, TryOnRequestHandler,
    TryOnSessionController, build_router, synthesizer_with_service,
};
use tryon_synthesis::{FetchedFile, ServiceFailure};
use tryon_utils::data_url;
use tryon_utils::test_support::{MultipartBody, png_of_len, tiny_png};
use tryon_utils::types::{GarmentRole, TRYON_PATH};

const GENERATED: [u8; 10] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 1];

/// Synthesis service that replays scripted outcomes.
struct ScriptedService {
    script: Mutex<Vec<Result<SynthesisOutput, ServiceFailure>>>,
    delay: Option<Duration>,
    calls: AtomicU32,
    requests: Mutex<Vec<(GarmentRole, usize, Option<String>)>>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedService {
    fn new(mut script: Vec<Result<SynthesisOutput, ServiceFailure>>) -> Arc<Self> {
        script.reverse();
        Arc::new(Self {
            script: Mutex::new(script),
            delay: None,
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Vec::new()),
            delay: Some(delay),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
        })
    }

    fn inline() -> Result<SynthesisOutput, ServiceFailure> {
        Ok(SynthesisOutput::Inline {
            bytes: GENERATED.to_vec(),
            mime: Some("image/png".to_string()),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisService for ScriptedService {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesisOutput, ServiceFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((
            request.garment_role,
            request.garment.len(),
            request.description.clone(),
        ));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(ScriptedService::inline)
    }

    async fn fetch(&self, url: &str) -> Result<FetchedFile, ServiceFailure> {
        self.fetched.lock().unwrap().push(url.to_string());
        Ok(FetchedFile {
            bytes: GENERATED.to_vec(),
            content_type: None,
        })
    }

    fn file_url(&self, path: &str) -> String {
        format!("https://files.example.test/file={path}")
    }
}

fn app(service: Arc<ScriptedService>) -> axum::Router {
    let synthesizer = synthesizer_with_service(
        service,
        Duration::from_secs(60),
        RetryPolicy {
            max_retries: 1,
            initial_backoff: Duration::from_secs(1),
        },
    );
    build_router(AppState::new(TryOnRequestHandler::new(synthesizer)))
}

fn post(body: MultipartBody) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(TRYON_PATH)
        .header(header::CONTENT_TYPE, body.content_type())
        .body(Body::from(body.build()))
        .unwrap()
}

fn person_and_shirt() -> MultipartBody {
    MultipartBody::new()
        .png("image", &png_of_len(4096))
        .png("shirt", &png_of_len(4096))
}

async fn send(app: axum::Router, body: MultipartBody) -> (StatusCode, Value) {
    let resp = app.oneshot(post(body)).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_person_and_shirt_succeeds_with_data_urls() {
    let service = ScriptedService::new(vec![ScriptedService::inline()]);
    let (status, json) = send(app(service.clone()), person_and_shirt()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Outfit generated successfully");
    let original = json["originalImage"].as_str().unwrap();
    let generated = json["generatedImage"].as_str().unwrap();
    assert!(original.starts_with("data:image/png;base64,"));
    assert!(generated.starts_with("data:image/png;base64,"));
    assert_eq!(data_url::decode(original).unwrap().bytes, png_of_len(4096));
    assert_eq!(data_url::decode(generated).unwrap().bytes, GENERATED.to_vec());

    let requests = service.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, GarmentRole::Shirt);
    assert_eq!(requests[0].1, 4096);
}

#[tokio::test]
async fn test_missing_person_makes_no_upstream_call() {
    let service = ScriptedService::new(vec![]);
    let body = MultipartBody::new().png("shirt", &tiny_png());
    let (status, json) = send(app(service.clone()), body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "No model image uploaded");
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn test_missing_garment_makes_no_upstream_call() {
    let service = ScriptedService::new(vec![]);
    let body = MultipartBody::new().png("image", &tiny_png());
    let (status, json) = send(app(service.clone()), body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "Please upload at least one garment (shirt or pants)"
    );
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn test_pants_only_with_clothing_description() {
    let service = ScriptedService::new(vec![ScriptedService::inline()]);
    let body = MultipartBody::new()
        .png("image", &tiny_png())
        .png("pants", &tiny_png())
        .text(
            "clothing",
            r#"{"pants":{"type":"Jeans","color":"blue"},"shoes":{"type":"Sneakers","color":"white"}}"#,
        );
    let (status, _) = send(app(service.clone()), body).await;

    assert_eq!(status, StatusCode::OK);
    let requests = service.requests.lock().unwrap();
    assert_eq!(requests[0].0, GarmentRole::Pants);
    assert_eq!(requests[0].2.as_deref(), Some("blue jeans, white sneakers"));
}

#[tokio::test(start_paused = true)]
async fn test_service_loading_is_retried_then_503() {
    let service = ScriptedService::new(vec![
        Err(ServiceFailure::http(503, "Model is loading")),
        Err(ServiceFailure::http(503, "Model is loading")),
    ]);
    let (status, json) = send(app(service.clone()), person_and_shirt()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json["error"],
        "Model is currently loading. Please try again in a few moments."
    );
    assert_eq!(service.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_maps_to_429() {
    let service = ScriptedService::new(vec![
        Err(ServiceFailure::http(429, "too many")),
        Err(ServiceFailure::transport("Monthly quota exceeded")),
    ]);
    let (status, json) = send(app(service.clone()), person_and_shirt()).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["success"], false);
    assert_eq!(service.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_service_times_out_with_504() {
    let service = ScriptedService::slow(Duration::from_secs(120));
    let (status, json) = send(app(service.clone()), person_and_shirt()).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        json["error"],
        "The AI model took too long to respond. Please try again."
    );
    assert_eq!(service.calls(), 2);
}

#[tokio::test]
async fn test_auth_failure_is_not_retried_and_hides_details() {
    let service = ScriptedService::new(vec![Err(ServiceFailure::http(
        401,
        "Invalid token hf_abcdefghijklmnopqrstuvwxyz0123456789",
    ))]);
    let (status, json) = send(app(service.clone()), person_and_shirt()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json["error"],
        "API configuration error. Please contact support."
    );
    assert_eq!(service.calls(), 1);
}

#[tokio::test]
async fn test_path_result_is_fetched_from_file_route() {
    let service = ScriptedService::new(vec![Ok(SynthesisOutput::Path(
        "/tmp/gradio/result.png".to_string(),
    ))]);
    let (status, json) = send(app(service.clone()), person_and_shirt()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        json["generatedImage"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );
    assert_eq!(
        *service.fetched.lock().unwrap(),
        vec!["https://files.example.test/file=/tmp/gradio/result.png".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_result_is_500() {
    let service = ScriptedService::new(vec![
        Ok(SynthesisOutput::Unrecognized {
            summary: "number".to_string(),
        }),
        Ok(SynthesisOutput::Unrecognized {
            summary: "number".to_string(),
        }),
    ]);
    let (status, json) = send(app(service), person_and_shirt()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json["error"],
        "failed to parse generated image from model response"
    );
}

#[tokio::test]
async fn test_client_round_trip_over_tcp() {
    let service = ScriptedService::new(vec![ScriptedService::inline()]);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(service.clone());
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let transport = HttpTransport::new(&format!("http://{addr}"), Duration::from_secs(10)).unwrap();
    let controller = TryOnSessionController::new(ClientUploadState::new(), Arc::new(transport));
    controller
        .uploads()
        .select(GarmentRole::Person, ImageFile::new("me.png", "image/png", tiny_png()))
        .unwrap();
    controller
        .uploads()
        .select(GarmentRole::Pants, ImageFile::new("p.png", "image/png", tiny_png()))
        .unwrap();

    let outcome = controller.submit().await.unwrap();
    assert!(matches!(
        outcome,
        SubmitOutcome::Finished(GenerationSessionState::Succeeded(_))
    ));
    assert_eq!(service.calls(), 1);

    let download = controller.download().unwrap().unwrap();
    assert!(download.file_name.starts_with("virtual-tryon-"));
    assert!(download.file_name.ends_with(".png"));
    assert_eq!(download.bytes, GENERATED.to_vec());
}
