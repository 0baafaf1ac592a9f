//! Per-slot upload state with asynchronous previews
//!
//! Each slot (person, shirt, pants) holds at most one accepted image and, once
//! its decode has finished, a data URL preview. Decodes run on the blocking
//! pool and are applied only if the slot's generation still matches, so a
//! later `select` or `remove` always wins over an earlier, slower decode.

use bytes::Bytes;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tryon_utils::data_url::{encode, is_image_mime, mime_from_file_name, sniff_image_mime};
use tryon_utils::error::{SynthesisError, TryOnError};
use tryon_utils::types::{GarmentRole, MAX_IMAGE_BYTES, size_label};

pub const NOT_AN_IMAGE_MESSAGE: &str = "Only image files are allowed";

/// A user-selected image file.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl ImageFile {
    #[must_use]
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, taking the mime type from the extension or the
    /// content.
    pub async fn from_path(path: &Path) -> Result<Self, TryOnError> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mime = mime_from_file_name(&name)
            .or_else(|| sniff_image_mime(&bytes))
            .unwrap_or("application/octet-stream");
        Ok(Self::new(name, mime, bytes))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// State of one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSlot {
    file: Option<ImageFile>,
    preview: Option<String>,
    generation: u64,
}

impl UploadSlot {
    #[must_use]
    pub fn file(&self) -> Option<&ImageFile> {
        self.file.as_ref()
    }

    /// Data URL preview; set only after the decode for the current file finished.
    #[must_use]
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.file.is_some()
    }

    fn replace(&mut self, file: Option<ImageFile>) -> u64 {
        self.generation += 1;
        self.file = file;
        self.preview = None;
        self.generation
    }
}

#[derive(Debug, Default)]
struct Slots {
    person: UploadSlot,
    shirt: UploadSlot,
    pants: UploadSlot,
}

impl Slots {
    fn get(&self, role: GarmentRole) -> &UploadSlot {
        match role {
            GarmentRole::Person => &self.person,
            GarmentRole::Shirt => &self.shirt,
            GarmentRole::Pants => &self.pants,
        }
    }

    fn get_mut(&mut self, role: GarmentRole) -> &mut UploadSlot {
        match role {
            GarmentRole::Person => &mut self.person,
            GarmentRole::Shirt => &mut self.shirt,
            GarmentRole::Pants => &mut self.pants,
        }
    }
}

/// Pending preview decode started by [`ClientUploadState::select`].
#[derive(Debug)]
pub struct PreviewTask {
    role: GarmentRole,
    generation: u64,
    handle: JoinHandle<bool>,
}

impl PreviewTask {
    #[must_use]
    pub fn role(&self) -> GarmentRole {
        self.role
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the decode; `true` if its preview was applied.
    pub async fn applied(self) -> bool {
        self.handle.await.unwrap_or(false)
    }
}

/// Upload slots shared between the UI side and the session controller.
#[derive(Debug, Clone)]
pub struct ClientUploadState {
    slots: Arc<Mutex<Slots>>,
    max_file_bytes: usize,
}

impl Default for ClientUploadState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientUploadState {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_file_bytes(MAX_IMAGE_BYTES)
    }

    #[must_use]
    pub fn with_max_file_bytes(max_file_bytes: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots::default())),
            max_file_bytes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept `file` into `role`'s slot and start decoding its preview.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::Validation`] if the file is not an image or
    /// exceeds the size limit; the slot is left untouched.
    pub fn select(&self, role: GarmentRole, file: ImageFile) -> Result<PreviewTask, SynthesisError> {
        if !is_image_mime(&file.mime) {
            return Err(SynthesisError::Validation(NOT_AN_IMAGE_MESSAGE.to_string()));
        }
        if file.len() > self.max_file_bytes {
            return Err(SynthesisError::Validation(format!(
                "File size exceeds {} limit",
                size_label(self.max_file_bytes)
            )));
        }

        let mime = file.mime.clone();
        let bytes = file.bytes.clone();
        let generation = self.lock().get_mut(role).replace(Some(file));
        debug!(role = %role, generation = generation, bytes = bytes.len(), "Image selected");

        let state = self.clone();
        let handle = tokio::spawn(async move {
            match tokio::task::spawn_blocking(move || encode(&mime, &bytes)).await {
                Ok(preview) => state.apply_preview(role, generation, preview),
                Err(e) => {
                    warn!(role = %role, error = %e, "Preview decode failed");
                    false
                }
            }
        });

        Ok(PreviewTask {
            role,
            generation,
            handle,
        })
    }

    /// Empty `role`'s slot. Any pending decode for it is discarded.
    pub fn remove(&self, role: GarmentRole) {
        self.lock().get_mut(role).replace(None);
    }

    /// Empty the garment slots, keeping the person slot.
    pub fn clear_garments(&self) {
        let mut slots = self.lock();
        for role in GarmentRole::GARMENTS {
            let slot = slots.get_mut(role);
            if slot.is_filled() || slot.preview.is_some() {
                slot.replace(None);
            }
        }
    }

    /// Snapshot of one slot.
    #[must_use]
    pub fn slot(&self, role: GarmentRole) -> UploadSlot {
        self.lock().get(role).clone()
    }

    #[must_use]
    pub fn has_person(&self) -> bool {
        self.lock().person.is_filled()
    }

    #[must_use]
    pub fn has_garment(&self) -> bool {
        let slots = self.lock();
        GarmentRole::GARMENTS
            .into_iter()
            .any(|role| slots.get(role).is_filled())
    }

    /// Person file plus every filled garment slot, in shirt, pants order.
    #[must_use]
    pub fn files(&self) -> (Option<ImageFile>, Vec<(GarmentRole, ImageFile)>) {
        let slots = self.lock();
        let garments = GarmentRole::GARMENTS
            .into_iter()
            .filter_map(|role| slots.get(role).file.clone().map(|file| (role, file)))
            .collect();
        (slots.person.file.clone(), garments)
    }

    /// Store a finished decode if `generation` is still current.
    pub(crate) fn apply_preview(&self, role: GarmentRole, generation: u64, preview: String) -> bool {
        let mut slots = self.lock();
        let slot = slots.get_mut(role);
        if slot.generation != generation || slot.file.is_none() {
            debug!(
                role = %role,
                stale = generation,
                current = slot.generation,
                "Discarding stale preview"
            );
            return false;
        }
        slot.preview = Some(preview);
        true
    }
}
