//! Client-side try-on session state machine
//!
//! ```text
//! Idle --submit--> Submitting --ok--> Succeeded
//!                             --err-> Failed
//! Succeeded | Failed --submit--> Submitting
//! any --clear / remove(person)--> Idle
//! ```
//!
//! Only one submission is in flight at a time. The state lives behind a
//! `std::sync::Mutex` that is never held across an await.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use tryon_utils::data_url::{self, extension_for_mime};
use tryon_utils::error::{DataUrlError, SynthesisError};
use tryon_utils::types::{ClothingSelection, GarmentRole};

use crate::transport::{TryOnRequest, TryOnResult, TryOnTransport};
use crate::upload::ClientUploadState;

pub const NO_PERSON_MESSAGE: &str = "no model image selected";
pub const NO_GARMENT_MESSAGE: &str = "no garment selected";
pub const INTERRUPTED_MESSAGE: &str = "submission was interrupted";

/// Where the session is in its submit cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GenerationSessionState {
    /// Nothing submitted since start or the last reset.
    #[default]
    Idle,
    /// A request is in flight.
    Submitting,
    /// The last request produced an image.
    Succeeded(TryOnResult),
    /// The last request failed.
    Failed(SynthesisError),
}

impl GenerationSessionState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

/// Outcome of [`TryOnSessionController::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Another submission was in flight; nothing was sent.
    Ignored,
    /// The request completed and the session moved to this state.
    Finished(GenerationSessionState),
    /// The request completed after a `clear()`; its result was dropped.
    Discarded,
}

/// A generated image ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct Session {
    state: GenerationSessionState,
    clothing: Option<ClothingSelection>,
    in_flight: bool,
    epoch: u64,
}

/// Drives submissions for one user's selection.
///
/// Owns the upload slots and the session state. At most one submission is in
/// flight; results that finish after a reset are dropped.
pub struct TryOnSessionController {
    uploads: ClientUploadState,
    transport: Arc<dyn TryOnTransport>,
    session: Mutex<Session>,
}

impl TryOnSessionController {
    #[must_use]
    pub fn new(uploads: ClientUploadState, transport: Arc<dyn TryOnTransport>) -> Self {
        Self {
            uploads,
            transport,
            session: Mutex::new(Session::default()),
        }
    }

    #[must_use]
    pub fn uploads(&self) -> &ClientUploadState {
        &self.uploads
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> GenerationSessionState {
        self.lock().state.clone()
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.lock().in_flight
    }

    pub fn set_clothing(&self, clothing: Option<ClothingSelection>) {
        self.lock().clothing = clothing;
    }

    #[must_use]
    pub fn clothing(&self) -> Option<ClothingSelection> {
        self.lock().clothing.clone()
    }

    /// Person image, at least one garment, nothing in flight.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.lock().in_flight && self.uploads.has_person() && self.uploads.has_garment()
    }

    /// Send the current selection to the server.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::Validation`] without touching the session or
    /// the network when the person slot or every garment slot is empty.
    pub async fn submit(&self) -> Result<SubmitOutcome, SynthesisError> {
        let (request, epoch) = {
            let mut session = self.lock();
            if session.in_flight {
                debug!("Submission already in flight, ignoring");
                return Ok(SubmitOutcome::Ignored);
            }

            let (person, garments) = self.uploads.files();
            let person = person
                .ok_or_else(|| SynthesisError::Validation(NO_PERSON_MESSAGE.to_string()))?;
            if garments.is_empty() {
                return Err(SynthesisError::Validation(NO_GARMENT_MESSAGE.to_string()));
            }

            let metadata = session.clothing.as_ref().and_then(|clothing| {
                serde_json::to_string(clothing)
                    .inspect_err(|e| warn!(error = %e, "Skipping clothing metadata"))
                    .ok()
            });

            session.in_flight = true;
            session.state = GenerationSessionState::Submitting;
            (
                TryOnRequest {
                    person,
                    garments,
                    metadata,
                },
                session.epoch,
            )
        };

        let guard = InFlightGuard {
            controller: self,
            epoch,
            finished: false,
        };

        info!(garments = request.garments.len(), "Submitting try-on");
        let state = match self.transport.send(&request).await {
            Ok(result) => GenerationSessionState::Succeeded(result),
            Err(error) => {
                warn!(kind = %error.kind(), error = %error.message(), "Try-on failed");
                GenerationSessionState::Failed(error)
            }
        };

        Ok(guard.finish(state))
    }

    /// Submit again with the same selection. Results are never cached.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub async fn regenerate(&self) -> Result<SubmitOutcome, SynthesisError> {
        self.submit().await
    }

    /// Reset garments, metadata and result. The person slot is kept.
    pub fn clear(&self) {
        let mut session = self.lock();
        self.uploads.clear_garments();
        session.clothing = None;
        session.state = GenerationSessionState::Idle;
        if session.in_flight {
            session.epoch += 1;
        }
    }

    /// Empty one slot.
    ///
    /// Removing the person image also drops the result, since it no longer
    /// matches the selection. A submission still in flight keeps running but
    /// its outcome is discarded.
    pub fn remove(&self, role: GarmentRole) {
        let mut session = self.lock();
        self.uploads.remove(role);
        if role == GarmentRole::Person {
            session.state = GenerationSessionState::Idle;
            if session.in_flight {
                session.epoch += 1;
            }
        }
    }

    /// The generated image with a timestamped file name, if the last
    /// submission succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`DataUrlError`] if the server's image is not a valid data URL.
    pub fn download(&self) -> Result<Option<Download>, DataUrlError> {
        let GenerationSessionState::Succeeded(result) = self.state() else {
            return Ok(None);
        };
        let decoded = data_url::decode(&result.generated_image)?;
        let file_name = format!(
            "virtual-tryon-{}.{}",
            Utc::now().timestamp_millis(),
            extension_for_mime(&decoded.mime)
        );
        Ok(Some(Download {
            file_name,
            mime: decoded.mime,
            bytes: decoded.bytes,
        }))
    }
}

/// Releases the in-flight flag however the submitting future ends.
struct InFlightGuard<'a> {
    controller: &'a TryOnSessionController,
    epoch: u64,
    finished: bool,
}

impl InFlightGuard<'_> {
    fn finish(mut self, state: GenerationSessionState) -> SubmitOutcome {
        self.finished = true;
        let mut session = self.controller.lock();
        session.in_flight = false;
        if session.epoch != self.epoch {
            debug!("Discarding result of a cleared submission");
            return SubmitOutcome::Discarded;
        }
        session.state = state.clone();
        SubmitOutcome::Finished(state)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut session = self.controller.lock();
        session.in_flight = false;
        if session.epoch == self.epoch {
            warn!("Try-on submission dropped before completion");
            session.state =
                GenerationSessionState::Failed(SynthesisError::Unknown(INTERRUPTED_MESSAGE.into()));
        }
    }
}
