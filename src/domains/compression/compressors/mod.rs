//! Compressors for the supported media categories

pub mod image_compressor;
pub mod pdf_compressor;
pub mod video_compressor;

use async_trait::async_trait;
use std::path::Path;
use crate::errors::DomainResult;
use super::types::{MediaCategory, Preset};

/// Common trait for all compressors
#[async_trait]
pub trait Compressor: Send + Sync {
    /// Check if this compressor can handle the given file
    async fn can_handle(&self, mime_type: &str, extension: Option<&str>) -> bool;

    /// Compress file data with the parameters derived from `preset`.
    /// The output keeps the input's file type.
    async fn compress(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        preset: Preset,
    ) -> DomainResult<Vec<u8>>;

    /// Category this compressor serves
    fn category(&self) -> MediaCategory;

    fn compressor_name(&self) -> &'static str;
}

/// Utility function to get file extension from filename
pub fn get_extension(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|ext| ext.to_str())
}

/// Sniff the MIME type from content, falling back to the file extension
pub fn detect_mime_type(filename: &str, data: &[u8]) -> &'static str {
    match infer::get(data) {
        Some(kind) => kind.mime_type(),
        None => guess_mime_type(filename),
    }
}

/// Utility function to guess MIME type from extension
pub fn guess_mime_type(filename: &str) -> &'static str {
    match get_extension(filename).unwrap_or("").to_lowercase().as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",

        // Documents
        "pdf" => "application/pdf",

        // Text files
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "csv" => "text/csv",
        "md" => "text/markdown",

        // Video
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "m4v" => "video/x-m4v",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",

        _ => "application/octet-stream",
    }
}

/// Default extension for a MIME type, used when naming temp files
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/tiff" => Some("tiff"),
        "image/bmp" => Some("bmp"),
        "application/pdf" => Some("pdf"),
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/x-m4v" => Some("m4v"),
        "video/x-msvideo" => Some("avi"),
        "video/x-matroska" => Some("mkv"),
        "video/webm" => Some("webm"),
        _ => None,
    }
}
