//! Bounded retry with exponential backoff around a [`Synthesizer`]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use tryon_config::Config;
use tryon_error_redaction::redact_error_message_for_logging;
use tryon_utils::error::SynthesisError;
use tryon_utils::logging::log_attempt_start;

use crate::types::{SynthesisRequest, SynthesizedImage, Synthesizer};

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each later retry.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.synthesis.max_retries,
            initial_backoff: config.initial_backoff(),
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retry `n` (0-based): `initial_backoff * 2^n`.
    #[must_use]
    pub fn backoff_for(&self, retry: u32) -> Duration {
        2u32.checked_pow(retry)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

/// Retries retriable synthesis failures.
///
/// `AuthConfig` and `Validation` failures are returned immediately. When
/// every attempt fails, the last attempt's error is returned unchanged.
pub struct RetryCoordinator {
    inner: Arc<dyn Synthesizer>,
    policy: RetryPolicy,
}

impl RetryCoordinator {
    #[must_use]
    pub fn new(inner: Arc<dyn Synthesizer>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl Synthesizer for RetryCoordinator {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedImage, SynthesisError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            log_attempt_start(attempt, max_attempts, request.garment_role.as_str());

            let error = match self.inner.synthesize(request).await {
                Ok(image) => {
                    info!(attempt = attempt, bytes = image.bytes.len(), "Synthesis succeeded");
                    return Ok(image);
                }
                Err(error) => error,
            };

            if !error.is_retriable() || attempt >= max_attempts {
                warn!(
                    attempt = attempt,
                    kind = %error.kind(),
                    error = %redact_error_message_for_logging(error.message()),
                    "Synthesis failed"
                );
                return Err(error);
            }

            let backoff = self.policy.backoff_for(attempt - 1);
            warn!(
                attempt = attempt,
                kind = %error.kind(),
                backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                "Synthesis failed, will retry"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageInput;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;
    use tryon_utils::error::ErrorKind;
    use tryon_utils::test_support::png_of_len;
    use tryon_utils::types::GarmentRole;

    /// Synthesizer that replays a script of outcomes and records call times.
    struct MockSynthesizer {
        script: Mutex<Vec<Result<SynthesizedImage, SynthesisError>>>,
        calls: AtomicU32,
        call_times: Mutex<Vec<Instant>>,
    }

    impl MockSynthesizer {
        fn new(mut script: Vec<Result<SynthesizedImage, SynthesisError>>) -> Arc<Self> {
            script.reverse();
            Arc::new(Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
                call_times: Mutex::new(Vec::new()),
            })
        }

        fn always(error: SynthesisError) -> Arc<Self> {
            Self::new(vec![Err(error); 10])
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Synthesizer for MockSynthesizer {
        async fn synthesize(
            &self,
            _request: &SynthesisRequest,
        ) -> Result<SynthesizedImage, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.call_times.lock().unwrap().push(Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(SynthesisError::Unknown("script exhausted".into())))
        }
    }

    fn image() -> SynthesizedImage {
        SynthesizedImage {
            bytes: vec![1; 10],
            mime: "image/png".to_string(),
        }
    }

    fn request() -> SynthesisRequest {
        SynthesisRequest::new(
            ImageInput::new(png_of_len(128), "image/png"),
            ImageInput::new(png_of_len(64), "image/png"),
            GarmentRole::Pants,
        )
    }

    fn coordinator(mock: &Arc<MockSynthesizer>, max_retries: u32) -> RetryCoordinator {
        RetryCoordinator::new(
            mock.clone(),
            RetryPolicy {
                max_retries,
                initial_backoff: Duration::from_secs(1),
            },
        )
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
        assert_eq!(policy.max_attempts(), 2);
        assert_eq!(policy.backoff_for(64), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_loading_retried_once_with_one_second_backoff() {
        let mock = MockSynthesizer::always(SynthesisError::ServiceLoading("cold".into()));
        let err = coordinator(&mock, 1)
            .synthesize(&request())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ServiceLoading);
        assert_eq!(mock.calls(), 2);

        let times = mock.call_times.lock().unwrap();
        let gap = times[1] - times[0];
        assert!(gap >= Duration::from_secs(1), "gap was {gap:?}");
        assert!(gap < Duration::from_millis(1100), "gap was {gap:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_and_last_error_is_returned() {
        let mock = MockSynthesizer::new(vec![
            Err(SynthesisError::RateLimited("first".into())),
            Err(SynthesisError::Unknown("second".into())),
            Err(SynthesisError::Timeout("third".into())),
        ]);
        let start = Instant::now();
        let err = coordinator(&mock, 2)
            .synthesize(&request())
            .await
            .unwrap_err();

        assert_eq!(err, SynthesisError::Timeout("third".into()));
        assert_eq!(mock.calls(), 3);
        // 1s + 2s, and no wait after the final attempt
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_config_is_not_retried() {
        let mock = MockSynthesizer::always(SynthesisError::AuthConfig("bad key".into()));
        let start = Instant::now();
        let err = coordinator(&mock, 3)
            .synthesize(&request())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AuthConfig);
        assert_eq!(mock.calls(), 1);
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_validation_is_not_retried() {
        let mock = MockSynthesizer::always(SynthesisError::Validation("bad".into()));
        coordinator(&mock, 3).synthesize(&request()).await.unwrap_err();
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_retry() {
        let mock = MockSynthesizer::new(vec![
            Err(SynthesisError::ServiceLoading("cold".into())),
            Ok(image()),
        ]);
        let result = coordinator(&mock, 1).synthesize(&request()).await.unwrap();
        assert_eq!(result, image());
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let mock = MockSynthesizer::always(SynthesisError::Unknown("x".into()));
        coordinator(&mock, 0).synthesize(&request()).await.unwrap_err();
        assert_eq!(mock.calls(), 1);
    }
}
