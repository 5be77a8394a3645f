//! Image intake
//!
//! Turns a user-supplied file into a [`PendingUpload`]. Drop-zone and file
//! picker uploads take the same path. Content type is sniffed from the
//! payload's magic bytes; the browser-declared type is only trusted when
//! sniffing is inconclusive.

use axum::body::Bytes;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::IntakeConfig;
use crate::models::{ImagePayload, PendingUpload};
use crate::services::preview_store::PreviewStore;

const DEFAULT_FILE_NAME: &str = "upload";

/// Recoverable, user-visible intake errors
#[derive(Debug, Error, PartialEq)]
pub enum IntakeError {
    #[error("No image selected")]
    Empty,

    #[error("Image is too large ({size} bytes, limit {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Unsupported file type '{0}'. Please select a chest X-ray image (PNG, JPEG, ...)")]
    NotAnImage(String),

    #[error("File content is not a valid '{0}' image. Please select a chest X-ray image")]
    ContentMismatch(String),
}

/// Accepts uploads and allocates their previews
#[derive(Debug, Clone)]
pub struct ImageIntake {
    previews: PreviewStore,
    max_upload_bytes: usize,
}

impl ImageIntake {
    pub fn new(previews: PreviewStore, config: &IntakeConfig) -> Self {
        Self {
            previews,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Validate a file and produce a pending upload
    pub fn accept(
        &self,
        file_name: Option<String>,
        declared_mime: Option<String>,
        bytes: Bytes,
    ) -> Result<PendingUpload, IntakeError> {
        if bytes.is_empty() {
            return Err(IntakeError::Empty);
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(IntakeError::TooLarge {
                size: bytes.len(),
                max: self.max_upload_bytes,
            });
        }

        let mime_type = sniff_image_type(&bytes, declared_mime.as_deref())?;
        let file_name = file_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

        let upload_id = Uuid::new_v4();
        let preview = self
            .previews
            .acquire(upload_id, mime_type.clone(), bytes.clone());

        info!(
            upload_id = %upload_id,
            file_name = %file_name,
            mime_type = %mime_type,
            size_bytes = bytes.len(),
            "Image accepted"
        );

        Ok(PendingUpload::new(
            ImagePayload {
                upload_id,
                file_name,
                mime_type,
                bytes,
            },
            preview,
        ))
    }
}

/// Scriptable image formats that must never be served back as previews
const REJECTED_IMAGE_TYPES: &[&str] = &["image/svg+xml"];

/// Determine the image MIME type of a payload
///
/// The declared type is trusted only for image formats the sniffer cannot
/// recognise; a declared type it does recognise must match the bytes.
fn sniff_image_type(bytes: &[u8], declared_mime: Option<&str>) -> Result<String, IntakeError> {
    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => {
            Ok(kind.mime_type().to_string())
        }
        Some(kind) => Err(IntakeError::NotAnImage(kind.mime_type().to_string())),
        None => {
            let mime = declared_mime
                .map(normalize_mime)
                .ok_or_else(|| IntakeError::NotAnImage("unknown".to_string()))?;

            if !mime.starts_with("image/") || REJECTED_IMAGE_TYPES.contains(&mime.as_str()) {
                return Err(IntakeError::NotAnImage(mime));
            }
            if infer::is_mime_supported(&mime) {
                return Err(IntakeError::ContentMismatch(mime));
            }

            debug!(declared = %mime, "Magic bytes inconclusive, trusting declared image type");
            Ok(mime)
        }
    }
}

/// Lowercased essence of a MIME type, parameters dropped
fn normalize_mime(mime: &str) -> String {
    mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const PDF_HEADER: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";

    fn intake(max: usize) -> (ImageIntake, PreviewStore) {
        let store = PreviewStore::new();
        let intake = ImageIntake::new(store.clone(), &IntakeConfig { max_upload_bytes: max });
        (intake, store)
    }

    #[test]
    fn test_png_is_accepted_with_sniffed_type() {
        let (intake, store) = intake(1024);
        let upload = intake
            .accept(
                Some("chest.png".to_string()),
                Some("application/octet-stream".to_string()),
                Bytes::from_static(PNG_HEADER),
            )
            .unwrap();

        assert_eq!(upload.payload().mime_type, "image/png");
        assert_eq!(upload.payload().file_name, "chest.png");
        assert_eq!(store.active_count(), 1);
        assert!(store.get(upload.upload_id()).is_some());
    }

    #[test]
    fn test_non_image_is_rejected() {
        let (intake, store) = intake(1024);
        let err = intake
            .accept(None, Some("image/png".to_string()), Bytes::from_static(PDF_HEADER))
            .unwrap_err();

        assert_eq!(err, IntakeError::NotAnImage("application/pdf".to_string()));
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn test_declared_type_used_when_sniffing_inconclusive() {
        let (intake, _store) = intake(1024);
        let upload = intake
            .accept(None, Some("image/x-portable-graymap".to_string()), Bytes::from_static(b"P5 2 2 255"))
            .unwrap();
        assert_eq!(upload.payload().mime_type, "image/x-portable-graymap");
        assert_eq!(upload.payload().file_name, "upload");

        let err = intake
            .accept(None, Some("text/plain".to_string()), Bytes::from_static(b"hello"))
            .unwrap_err();
        assert!(matches!(err, IntakeError::NotAnImage(_)));
    }

    #[test]
    fn test_empty_and_oversized_rejected() {
        let (intake, _store) = intake(4);
        assert_eq!(intake.accept(None, None, Bytes::new()).unwrap_err(), IntakeError::Empty);
        assert_eq!(
            intake
                .accept(None, None, Bytes::from_static(PNG_HEADER))
                .unwrap_err(),
            IntakeError::TooLarge { size: PNG_HEADER.len(), max: 4 }
        );
    }

    #[test]
    fn test_declared_type_must_match_detectable_content() {
        let (intake, store) = intake(1024);
        let err = intake
            .accept(
                Some("notes.png".to_string()),
                Some("image/png".to_string()),
                Bytes::from_static(b"patient notes, not an image"),
            )
            .unwrap_err();

        assert_eq!(err, IntakeError::ContentMismatch("image/png".to_string()));
        assert_eq!(store.active_count(), 0);

        let err = intake
            .accept(None, Some("Image/JPEG; charset=binary".to_string()), Bytes::from_static(b"plain text"))
            .unwrap_err();
        assert_eq!(err, IntakeError::ContentMismatch("image/jpeg".to_string()));
    }

    #[test]
    fn test_svg_is_always_rejected() {
        let (intake, store) = intake(1024);
        let err = intake
            .accept(
                Some("scan.svg".to_string()),
                Some("image/svg+xml".to_string()),
                Bytes::from_static(b"<svg xmlns=\"http://www.w3.org/2000/svg\"><script>alert(1)</script></svg>"),
            )
            .unwrap_err();

        assert!(matches!(err, IntakeError::NotAnImage(_)));
        assert_eq!(store.active_count(), 0);
    }
}
