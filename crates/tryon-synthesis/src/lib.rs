//! Remote garment synthesis
//!
//! Layers, innermost first:
//!
//! - [`SynthesisService`]: the external capability ([`HttpSynthesisService`])
//! - [`LazyServiceHandle`]: builds the service once, on first use
//! - [`SynthesisInvoker`]: one attempt with timeout, response normalization and
//!   error classification
//! - [`RetryCoordinator`]: bounded retry with exponential backoff
//!
//! [`synthesizer_from_config`] wires the stack the way the server uses it.

mod handle;
mod http_client;
mod http_service;
mod invoker;
mod retry;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tryon_config::Config;

pub use handle::LazyServiceHandle;
pub use http_service::HttpSynthesisService;
pub use invoker::{
    DEFAULT_TIMEOUT, LOADING_MESSAGE, RATE_LIMIT_MESSAGE, SynthesisInvoker, TIMEOUT_MESSAGE,
    UNPARSEABLE_MESSAGE, classify,
};
pub use retry::{RetryCoordinator, RetryPolicy};
pub use types::{
    FetchedFile, ImageInput, ServiceFailure, SynthesisOutput, SynthesisRequest, SynthesisService,
    SynthesizedImage, Synthesizer,
};

/// Build the full synthesis stack from configuration.
///
/// The HTTP service is not constructed until the first request, so a server
/// can start without an API key and report `AuthConfig` per request instead.
#[must_use]
pub fn synthesizer_from_config(config: &Config) -> Arc<dyn Synthesizer> {
    let service_config = config.clone();
    let handle = LazyServiceHandle::new(move || {
        HttpSynthesisService::new_from_config(&service_config)
            .map(|service| Arc::new(service) as Arc<dyn SynthesisService>)
    });

    synthesizer_with_handle(
        Arc::new(handle),
        config.synthesis_timeout(),
        RetryPolicy::from_config(config),
    )
}

/// Build the stack around an existing service.
#[must_use]
pub fn synthesizer_with_service(
    service: Arc<dyn SynthesisService>,
    timeout: Duration,
    policy: RetryPolicy,
) -> Arc<dyn Synthesizer> {
    synthesizer_with_handle(Arc::new(LazyServiceHandle::ready(service)), timeout, policy)
}

fn synthesizer_with_handle(
    handle: Arc<LazyServiceHandle>,
    timeout: Duration,
    policy: RetryPolicy,
) -> Arc<dyn Synthesizer> {
    let invoker = Arc::new(SynthesisInvoker::new(handle, timeout));
    Arc::new(RetryCoordinator::new(invoker, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tryon_utils::error::ErrorKind;
    use tryon_utils::test_support::png_of_len;
    use tryon_utils::types::GarmentRole;

    #[tokio::test]
    async fn test_missing_api_key_is_auth_config_per_request() {
        let config = Config::builder()
            .api_key_env("TRYON_TEST_UNSET_API_KEY")
            .build()
            .unwrap();
        let synthesizer = synthesizer_from_config(&config);

        let request = SynthesisRequest::new(
            ImageInput::new(png_of_len(64), "image/png"),
            ImageInput::new(png_of_len(64), "image/png"),
            GarmentRole::Shirt,
        );
        let err = synthesizer.synthesize(&request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthConfig);
        assert!(err.message().contains("TRYON_TEST_UNSET_API_KEY"));
    }
}
