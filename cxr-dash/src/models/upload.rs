//! Pending upload
//!
//! Holds the selected image until it is replaced. The preview handle is owned
//! here, so dropping the upload releases the preview.

use axum::body::Bytes;
use uuid::Uuid;

use crate::services::preview_store::PreviewHandle;

/// Image bytes plus identification, cheap to clone into a run
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub upload_id: Uuid,
    pub file_name: String,
    /// Sniffed MIME type (always `image/*`)
    pub mime_type: String,
    pub bytes: Bytes,
}

/// The currently selected image
#[derive(Debug)]
pub struct PendingUpload {
    payload: ImagePayload,
    preview: PreviewHandle,
}

impl PendingUpload {
    pub fn new(payload: ImagePayload, preview: PreviewHandle) -> Self {
        Self { payload, preview }
    }

    pub fn upload_id(&self) -> Uuid {
        self.payload.upload_id
    }

    pub fn payload(&self) -> &ImagePayload {
        &self.payload
    }

    /// Locally resolvable URL for the preview image
    pub fn preview_url(&self) -> String {
        self.preview.url()
    }

    pub fn size_bytes(&self) -> usize {
        self.payload.bytes.len()
    }
}
