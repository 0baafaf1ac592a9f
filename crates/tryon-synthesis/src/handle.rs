//! Lazily constructed, process-wide synthesis service handle

use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use tryon_error_redaction::redact_error_message_for_logging;
use tryon_utils::error::SynthesisError;

use crate::types::SynthesisService;

type Initializer =
    Box<dyn Fn() -> Result<Arc<dyn SynthesisService>, SynthesisError> + Send + Sync>;

/// Handle that builds the synthesis service on first use.
///
/// Concurrent first uses run the initializer once. A failed initialization
/// is not cached: the next call tries again, so setting a missing API key
/// takes effect without a restart. Initialization failures surface as
/// [`SynthesisError::AuthConfig`].
pub struct LazyServiceHandle {
    cell: OnceCell<Arc<dyn SynthesisService>>,
    init: Initializer,
}

impl LazyServiceHandle {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn SynthesisService>, SynthesisError> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            init: Box::new(init),
        }
    }

    /// A handle around an already constructed service.
    #[must_use]
    pub fn ready(service: Arc<dyn SynthesisService>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(service)),
            init: Box::new(|| {
                Err(SynthesisError::AuthConfig(
                    "synthesis service already initialized".to_string(),
                ))
            }),
        }
    }

    /// Get the service, constructing it if needed.
    pub async fn get(&self) -> Result<Arc<dyn SynthesisService>, SynthesisError> {
        let service = self
            .cell
            .get_or_try_init(|| async {
                match (self.init)() {
                    Ok(service) => {
                        info!(service = service.name(), "Synthesis service initialized");
                        Ok(service)
                    }
                    Err(e) => {
                        warn!(
                            error = %redact_error_message_for_logging(e.message()),
                            "Synthesis service initialization failed"
                        );
                        Err(SynthesisError::AuthConfig(e.message().to_string()))
                    }
                }
            })
            .await?;
        Ok(Arc::clone(service))
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

impl fmt::Debug for LazyServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyServiceHandle")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FetchedFile, ServiceFailure, SynthesisOutput, SynthesisRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct NullService;

    #[async_trait]
    impl SynthesisService for NullService {
        async fn synthesize(
            &self,
            _request: &SynthesisRequest,
        ) -> Result<SynthesisOutput, ServiceFailure> {
            Err(ServiceFailure::transport("null"))
        }

        async fn fetch(&self, _url: &str) -> Result<FetchedFile, ServiceFailure> {
            Err(ServiceFailure::transport("null"))
        }

        fn file_url(&self, path: &str) -> String {
            path.to_string()
        }
    }

    #[tokio::test]
    async fn test_initializer_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let handle = Arc::new(LazyServiceHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NullService) as Arc<dyn SynthesisService>)
        }));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.get().await.is_ok() })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(handle.is_initialized());
    }

    #[tokio::test]
    async fn test_failed_init_is_not_cached() {
        let key_present = Arc::new(AtomicBool::new(false));
        let flag = key_present.clone();
        let handle = LazyServiceHandle::new(move || {
            if flag.load(Ordering::SeqCst) {
                Ok(Arc::new(NullService) as Arc<dyn SynthesisService>)
            } else {
                Err(SynthesisError::Unknown(
                    "HUGGINGFACE_API_KEY is not configured".to_string(),
                ))
            }
        });

        let err = handle.get().await.err().unwrap();
        assert_eq!(
            err,
            SynthesisError::AuthConfig("HUGGINGFACE_API_KEY is not configured".to_string())
        );
        assert!(!handle.is_initialized());

        key_present.store(true, Ordering::SeqCst);
        assert!(handle.get().await.is_ok());
        assert!(handle.is_initialized());
    }

    #[tokio::test]
    async fn test_ready_handle_skips_init() {
        let handle = LazyServiceHandle::ready(Arc::new(NullService));
        assert!(handle.is_initialized());
        assert!(handle.get().await.is_ok());
    }
}
