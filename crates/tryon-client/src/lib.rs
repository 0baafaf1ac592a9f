//! Try-on client
//!
//! [`ClientUploadState`] holds the person/shirt/pants selections and their
//! previews; [`TryOnSessionController`] turns them into one request at a time
//! through a [`TryOnTransport`] and tracks the outcome.

mod session;
mod transport;
mod upload;

pub use session::{
    Download, GenerationSessionState, INTERRUPTED_MESSAGE, NO_GARMENT_MESSAGE, NO_PERSON_MESSAGE,
    SubmitOutcome, TryOnSessionController,
};
pub use transport::{
    DEFAULT_CLIENT_TIMEOUT, HttpTransport, TryOnRequest, TryOnResult, TryOnTransport,
};
pub use upload::{ClientUploadState, ImageFile, NOT_AN_IMAGE_MESSAGE, PreviewTask, UploadSlot};
