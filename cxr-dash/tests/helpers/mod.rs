//! Test Helper Utilities
//!
//! Shared utilities for testing cxr-dash

#![allow(dead_code, unused_imports)]

pub mod stages;
pub mod stubs;

pub use stages::{CallLog, ClassifyBehavior, ScriptedClassifier, ScriptedExplainer};
pub use stubs::{spawn_stub, test_config, unreachable_url};

use axum::body::Bytes;
use cxr_dash::config::IntakeConfig;
use cxr_dash::models::PendingUpload;
use cxr_dash::services::{ImageIntake, PreviewStore};

/// Minimal PNG: signature plus the start of an IHDR chunk
pub const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x00, 0x00, 0x00, 0x00,
];

/// Accept `PNG_BYTES` through a fresh intake
pub fn png_upload(store: &PreviewStore) -> PendingUpload {
    let intake = ImageIntake::new(store.clone(), &IntakeConfig::default());
    intake
        .accept(
            Some("chest.png".to_string()),
            Some("image/png".to_string()),
            Bytes::from_static(PNG_BYTES),
        )
        .expect("PNG should be accepted")
}

/// Build a multipart/form-data body with one file field
///
/// Returns (content-type header value, body).
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----cxr-test-boundary-7MA4YWxkTrZu0gW";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}
