//! Type definitions for the compression domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;
use crate::errors::{DomainError, DomainResult, ValidationError};
use super::compressors::detect_mime_type;

/// Labelled parameter bundles offered to the user.
///
/// The labels name classic algorithms but only select tuning parameters
/// for the underlying image/video/PDF libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Best overall compression
    #[default]
    Lz77,

    /// Best for repetitive data
    Rle,

    /// Good for text files
    Bpe,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Lz77, Preset::Rle, Preset::Bpe];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Lz77 => "lz77",
            Preset::Rle => "rle",
            Preset::Bpe => "bpe",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Preset::Lz77 => "LZ77",
            Preset::Rle => "RLE",
            Preset::Bpe => "BPE",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Preset::Lz77 => "Best overall compression",
            Preset::Rle => "Best for repetitive data",
            Preset::Bpe => "Good for text files",
        }
    }

    /// Initial encoder quality for images, 0.0 - 1.0
    pub fn image_quality(&self) -> f32 {
        match self {
            Preset::Lz77 => 0.6,
            Preset::Rle => 0.7,
            Preset::Bpe => 0.65,
        }
    }

    pub fn video_settings(&self) -> VideoSettings {
        match self {
            Preset::Lz77 => VideoSettings {
                crf: 28,
                encoder_preset: "medium".to_string(),
                max_bitrate_kbps: 1000,
                audio_bitrate_kbps: 96,
            },
            Preset::Rle => VideoSettings {
                crf: 23,
                encoder_preset: "fast".to_string(),
                max_bitrate_kbps: 2000,
                audio_bitrate_kbps: 128,
            },
            Preset::Bpe => VideoSettings {
                crf: 26,
                encoder_preset: "medium".to_string(),
                max_bitrate_kbps: 1500,
                audio_bitrate_kbps: 128,
            },
        }
    }

    pub fn pdf_settings(&self) -> PdfSettings {
        match self {
            Preset::Lz77 => PdfSettings {
                compress_streams: true,
                prune_unused_objects: true,
                strip_metadata: true,
            },
            Preset::Rle => PdfSettings {
                compress_streams: true,
                prune_unused_objects: true,
                strip_metadata: false,
            },
            Preset::Bpe => PdfSettings {
                compress_streams: true,
                prune_unused_objects: false,
                strip_metadata: false,
            },
        }
    }

    pub fn info(&self) -> PresetInfo {
        PresetInfo {
            label: self.as_str().to_string(),
            name: self.display_name().to_string(),
            description: self.description().to_string(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lz77" => Ok(Preset::Lz77),
            "rle" => Ok(Preset::Rle),
            "bpe" => Ok(Preset::Bpe),
            _ => Err(DomainError::Validation(ValidationError::invalid_value(
                "preset",
                &format!("expected one of lz77, rle, bpe, got {}", s),
            ))),
        }
    }
}

impl From<Preset> for String {
    fn from(preset: Preset) -> Self {
        preset.as_str().to_string()
    }
}

/// Serializable description of a preset for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetInfo {
    pub label: String,
    pub name: String,
    pub description: String,
}

/// Encoder parameters for the video path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSettings {
    pub crf: u8,
    pub encoder_preset: String,
    pub max_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
}

/// Rewrite flags for the PDF path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfSettings {
    pub compress_streams: bool,
    pub prune_unused_objects: bool,
    pub strip_metadata: bool,
}

/// Media families the dispatcher knows how to route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Video,
    Pdf,
}

impl MediaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Video => "video",
            MediaCategory::Pdf => "pdf",
        }
    }

    /// Categorize a MIME type. Returns `None` for anything we cannot compress.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let parsed: mime::Mime = mime_type.trim().parse().ok()?;
        let (top, sub) = (parsed.type_(), parsed.subtype());

        // Vector images have nothing for a raster encoder to do
        if top == mime::IMAGE && sub != mime::SVG {
            Some(MediaCategory::Image)
        } else if top == mime::VIDEO {
            Some(MediaCategory::Video)
        } else if top == mime::APPLICATION && sub == mime::PDF {
            Some(MediaCategory::Pdf)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which categories a session accepts at selection time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Image,
    Video,
    Pdf,
    Any,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Image => "image",
            SessionMode::Video => "video",
            SessionMode::Pdf => "pdf",
            SessionMode::Any => "any",
        }
    }

    pub fn accepts(&self, category: Option<MediaCategory>) -> bool {
        match (self, category) {
            (_, None) => false,
            (SessionMode::Any, Some(_)) => true,
            (SessionMode::Image, Some(c)) => c == MediaCategory::Image,
            (SessionMode::Video, Some(c)) => c == MediaCategory::Video,
            (SessionMode::Pdf, Some(c)) => c == MediaCategory::Pdf,
        }
    }

    /// Hint shown when a file is rejected
    pub fn expected_description(&self) -> &'static str {
        match self {
            SessionMode::Image => "Please select an image file (JPG, PNG, WebP, etc.)",
            SessionMode::Video => "Please select a video file (MP4, WebM, MOV, etc.)",
            SessionMode::Pdf => "Please select a PDF document",
            SessionMode::Any => "Please select an image, video or PDF file",
        }
    }
}

impl FromStr for SessionMode {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(SessionMode::Image),
            "video" => Ok(SessionMode::Video),
            "pdf" => Ok(SessionMode::Pdf),
            "any" => Ok(SessionMode::Any),
            _ => Err(DomainError::Validation(ValidationError::invalid_value(
                "mode",
                &format!("expected one of image, video, pdf, any, got {}", s),
            ))),
        }
    }
}

/// A user-selected input file. Never mutated once created.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Build a source file, sniffing its MIME type from content and name.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = detect_mime_type(&name, &data).to_string();
        Self { name, mime_type, data }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DomainError::File(format!("Invalid file name: {}", path.display())))?
            .to_string();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| DomainError::File(format!("Failed to read {}: {}", path.display(), e)))?;
        Ok(Self::from_bytes(name, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn category(&self) -> Option<MediaCategory> {
        MediaCategory::from_mime(&self.mime_type)
    }
}

/// Result from a compression operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionResult {
    pub id: Uuid,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub original_size: u64,
    pub compressed_size: u64,
    /// Percentage reduction; negative when the output grew
    pub compression_ratio: f64,
    pub file_name: String,
    pub preset: Preset,
    pub category: MediaCategory,
    pub mime_type: String,
    pub duration_ms: i64,
    pub completed_at: DateTime<Utc>,
}

impl CompressionResult {
    pub fn space_saved_bytes(&self) -> i64 {
        self.original_size as i64 - self.compressed_size as i64
    }
}

/// `(original - compressed) / original * 100`
pub fn compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0
}

/// Suggested output name: `compressed_<preset>_<original name>`
pub fn output_file_name(preset: Preset, original_name: &str) -> String {
    format!("compressed_{}_{}", preset.as_str(), original_name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Error,
}

/// A user-visible message emitted by the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn success(title: &str, description: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Success, title: title.to_string(), description: description.into() }
    }

    pub fn info(title: &str, description: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Info, title: title.to_string(), description: description.into() }
    }

    pub fn error(title: &str, description: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Error, title: title.to_string(), description: description.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_round_trip_and_default() {
        for preset in Preset::ALL {
            assert_eq!(preset.as_str().parse::<Preset>().unwrap(), preset);
        }
        assert_eq!(" RLE ".parse::<Preset>().unwrap(), Preset::Rle);
        assert!("huffman".parse::<Preset>().is_err());
        assert_eq!(Preset::default(), Preset::Lz77);
    }

    #[test]
    fn test_preset_parameter_tables() {
        assert_eq!(Preset::Lz77.image_quality(), 0.6);
        assert_eq!(Preset::Rle.image_quality(), 0.7);
        assert_eq!(Preset::Bpe.image_quality(), 0.65);
        assert_eq!(Preset::Rle.video_settings().crf, 23);
        assert!(Preset::Lz77.pdf_settings().strip_metadata);
        assert!(!Preset::Bpe.pdf_settings().prune_unused_objects);
    }

    #[test]
    fn test_category_from_mime() {
        assert_eq!(MediaCategory::from_mime("image/png"), Some(MediaCategory::Image));
        assert_eq!(MediaCategory::from_mime("video/mp4"), Some(MediaCategory::Video));
        assert_eq!(MediaCategory::from_mime("application/pdf"), Some(MediaCategory::Pdf));
        assert_eq!(MediaCategory::from_mime("text/plain"), None);
        assert_eq!(MediaCategory::from_mime("image/svg+xml"), None);
        assert_eq!(MediaCategory::from_mime("garbage"), None);
    }

    #[test]
    fn test_mode_gating() {
        assert!(SessionMode::Image.accepts(Some(MediaCategory::Image)));
        assert!(!SessionMode::Image.accepts(Some(MediaCategory::Video)));
        assert!(!SessionMode::Image.accepts(None));
        assert!(SessionMode::Any.accepts(Some(MediaCategory::Pdf)));
        assert!(!SessionMode::Any.accepts(None));
    }

    #[test]
    fn test_ratio_formula() {
        assert_eq!(compression_ratio(1000, 250), 75.0);
        assert_eq!(compression_ratio(1000, 1500), -50.0);
        assert_eq!(compression_ratio(0, 10), 0.0);
        let ratio = compression_ratio(2_097_152, 524_288);
        assert!((ratio - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name(Preset::Rle, "photo.jpg"), "compressed_rle_photo.jpg");
    }

    #[test]
    fn test_source_file_sniffs_mime() {
        let png_header = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let file = SourceFile::from_bytes("mislabelled.txt", png_header);
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.category(), Some(MediaCategory::Image));

        let text = SourceFile::from_bytes("notes.txt", b"hello world".to_vec());
        assert_eq!(text.mime_type, "text/plain");
        assert_eq!(text.category(), None);
    }
}
