//! Storage key generation and download content types.
//!
//! Key generation is centralized here so every caller produces the same
//! layout: `uploads/{uuid}.{ext}`.

use std::path::Path;
use uuid::Uuid;

const DEFAULT_PREFIX: &str = "uploads";

/// Generate a unique object key for an uploaded file, keeping its extension.
pub fn upload_key(original_filename: &str, prefix: Option<&str>) -> String {
    let prefix = prefix.unwrap_or(DEFAULT_PREFIX).trim_matches('/');
    let ext = Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext {
        Some(ext) if !ext.is_empty() => format!("{}/{}.{}", prefix, Uuid::new_v4(), ext),
        _ => format!("{}/{}", prefix, Uuid::new_v4()),
    }
}

/// Best-effort content type for serving a stored object, derived from its
/// key's extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    let ext = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("html") => "text/html",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}
