use async_trait::async_trait;
use chrono::Utc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::CompressorConfig;
use crate::errors::{DomainError, ServiceError, ServiceResult, ValidationError};
use super::compressors::{
    Compressor,
    get_extension,
    image_compressor::ImageCompressor,
    pdf_compressor::PdfCompressor,
    video_compressor::VideoCompressor,
};
use super::types::{
    compression_ratio, output_file_name, CompressionResult, MediaCategory, Preset, SourceFile,
};

#[async_trait]
pub trait CompressionService: Send + Sync {
    /// Route `file` to the compressor for its media category and normalize
    /// the output into a `CompressionResult`.
    async fn compress_file(
        &self,
        file: &SourceFile,
        preset: Preset,
    ) -> ServiceResult<CompressionResult>;

    /// Categories this service has a compressor for
    fn supported_categories(&self) -> Vec<MediaCategory>;
}

pub struct CompressionServiceImpl {
    compressors: Vec<Box<dyn Compressor>>,
    max_input_bytes: u64,
}

impl CompressionServiceImpl {
    pub fn new(config: &CompressorConfig) -> Self {
        let compressors: Vec<Box<dyn Compressor>> = vec![
            Box::new(ImageCompressor::new(config.image.clone())),
            Box::new(VideoCompressor::new(Some(config.ffmpeg_path.clone()))),
            Box::new(PdfCompressor),
        ];

        Self::with_compressors(compressors, config.max_input_bytes)
    }

    /// Build a dispatcher over an explicit compressor list
    pub fn with_compressors(compressors: Vec<Box<dyn Compressor>>, max_input_bytes: u64) -> Self {
        Self {
            compressors,
            max_input_bytes,
        }
    }

    /// Find the compressor for a categorized file
    async fn find_compressor(
        &self,
        category: MediaCategory,
        mime_type: &str,
        extension: Option<&str>,
    ) -> Option<&dyn Compressor> {
        for compressor in &self.compressors {
            if compressor.category() == category && compressor.can_handle(mime_type, extension).await {
                return Some(compressor.as_ref());
            }
        }
        None
    }
}

#[async_trait]
impl CompressionService for CompressionServiceImpl {
    async fn compress_file(
        &self,
        file: &SourceFile,
        preset: Preset,
    ) -> ServiceResult<CompressionResult> {
        let start_time = Instant::now();

        let category = MediaCategory::from_mime(&file.mime_type).ok_or_else(|| {
            log::warn!("Rejecting {} with unsupported type {}", file.name, file.mime_type);
            ServiceError::Domain(DomainError::UnsupportedFileType(file.mime_type.clone()))
        })?;

        let original_size = file.size();
        if original_size == 0 {
            return Err(ServiceError::Domain(DomainError::Validation(
                ValidationError::custom("File is empty")
            )));
        }
        if original_size > self.max_input_bytes {
            log::warn!("File too large for in-memory compression: {} bytes > {} bytes ({})",
                original_size, self.max_input_bytes, file.name);
            return Err(ServiceError::Domain(DomainError::Validation(
                ValidationError::custom("File is too large for compression")
            )));
        }

        let extension = get_extension(&file.name).map(|e| e.to_lowercase());
        let compressor = self
            .find_compressor(category, &file.mime_type, extension.as_deref())
            .await
            .ok_or_else(|| ServiceError::Domain(DomainError::UnsupportedFileType(file.mime_type.clone())))?;

        log::info!("Compressing {} ({}, {} bytes) with {} using preset {}",
            file.name, file.mime_type, original_size, compressor.compressor_name(), preset);

        // The source stays untouched; the compressor works on its own copy
        let data = compressor
            .compress(file.data.clone(), &file.mime_type, preset)
            .await
            .map_err(ServiceError::Domain)?;

        let compressed_size = data.len() as u64;
        let result = CompressionResult {
            id: Uuid::new_v4(),
            data,
            original_size,
            compressed_size,
            compression_ratio: compression_ratio(original_size, compressed_size),
            file_name: output_file_name(preset, &file.name),
            preset,
            category,
            mime_type: file.mime_type.clone(),
            duration_ms: start_time.elapsed().as_millis() as i64,
            completed_at: Utc::now(),
        };

        log::info!("Compressed {}: {} -> {} bytes ({:.1}%) in {} ms",
            file.name, original_size, compressed_size, result.compression_ratio, result.duration_ms);

        Ok(result)
    }

    fn supported_categories(&self) -> Vec<MediaCategory> {
        let mut categories: Vec<MediaCategory> = Vec::new();
        for compressor in &self.compressors {
            if !categories.contains(&compressor.category()) {
                categories.push(compressor.category());
            }
        }
        categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageLimits;
    use crate::domains::compression::compressors::image_compressor::tests::{gradient_jpeg, noise_png};
    use crate::domains::compression::compressors::pdf_compressor::tests::sample_pdf;
    use crate::errors::DomainResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts calls and echoes half of its input
    struct RecordingCompressor {
        category: MediaCategory,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Compressor for RecordingCompressor {
        async fn can_handle(&self, mime_type: &str, _extension: Option<&str>) -> bool {
            MediaCategory::from_mime(mime_type) == Some(self.category)
        }

        async fn compress(&self, data: Vec<u8>, _mime_type: &str, _preset: Preset) -> DomainResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DomainError::Compression("Failed to compress image".to_string()));
            }
            Ok(data[..data.len() / 2].to_vec())
        }

        fn category(&self) -> MediaCategory {
            self.category
        }

        fn compressor_name(&self) -> &'static str {
            "RecordingCompressor"
        }
    }

    fn recording_service(fail: bool) -> (CompressionServiceImpl, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let compressor = RecordingCompressor { category: MediaCategory::Image, calls: calls.clone(), fail };
        (CompressionServiceImpl::with_compressors(vec![Box::new(compressor)], 1024 * 1024), calls)
    }

    #[tokio::test]
    async fn test_unsupported_type_never_reaches_compressor() {
        let (service, calls) = recording_service(false);
        let file = SourceFile::new("notes.txt", "text/plain", b"plain text".to_vec());

        let err = service.compress_file(&file, Preset::Lz77).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::UnsupportedFileType(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_category_without_compressor_is_unsupported() {
        let (service, calls) = recording_service(false);
        let file = SourceFile::new("clip.mp4", "video/mp4", vec![1u8; 128]);

        let err = service.compress_file(&file, Preset::Lz77).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::UnsupportedFileType(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_result_is_normalized() {
        let (service, calls) = recording_service(false);
        let file = SourceFile::new("photo.png", "image/png", vec![7u8; 1000]);

        let result = service.compress_file(&file, Preset::Bpe).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.original_size, 1000);
        assert_eq!(result.compressed_size, 500);
        assert_eq!(result.data.len(), 500);
        assert!((result.compression_ratio - 50.0).abs() < 1e-9);
        assert_eq!(result.file_name, "compressed_bpe_photo.png");
        assert_eq!(result.category, MediaCategory::Image);
        // Source is untouched
        assert_eq!(file.data.len(), 1000);
    }

    #[tokio::test]
    async fn test_compressor_failure_propagates_without_retry() {
        let (service, calls) = recording_service(true);
        let file = SourceFile::new("photo.png", "image/png", vec![7u8; 10]);

        let err = service.compress_file(&file, Preset::Lz77).await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to compress image");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_and_oversized_inputs_rejected() {
        let (service, calls) = recording_service(false);

        let empty = SourceFile::new("empty.png", "image/png", Vec::new());
        assert!(service.compress_file(&empty, Preset::Lz77).await.is_err());

        let huge = SourceFile::new("huge.png", "image/png", vec![0u8; 1024 * 1024 + 1]);
        let err = service.compress_file(&huge, Preset::Lz77).await.unwrap_err();
        assert_eq!(err.user_message(), "File is too large for compression");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_two_mib_image_with_rle_preset() {
        let service = CompressionServiceImpl::new(&CompressorConfig::default());
        let data = noise_png(840, 840, 42);
        assert!(data.len() >= 2_097_152, "fixture only {} bytes", data.len());
        let file = SourceFile::from_bytes("scenario.png", data);

        let result = service.compress_file(&file, Preset::Rle).await.unwrap();
        assert_eq!(result.file_name, "compressed_rle_scenario.png");
        assert!(result.original_size > 0 && result.compressed_size > 0);
        assert!(result.compressed_size <= result.original_size);
        let expected = (result.original_size as f64 - result.compressed_size as f64)
            / result.original_size as f64 * 100.0;
        assert!((result.compression_ratio - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_same_preset_different_files_are_independent() {
        let config = CompressorConfig {
            image: ImageLimits { max_size_bytes: 64 * 1024, ..ImageLimits::default() },
            ..CompressorConfig::default()
        };
        let service = CompressionServiceImpl::new(&config);
        let first = SourceFile::from_bytes("a.jpg", gradient_jpeg(320, 240));
        let second = SourceFile::from_bytes("b.png", noise_png(128, 128, 3));

        let r1 = service.compress_file(&first, Preset::Lz77).await.unwrap();
        let r2 = service.compress_file(&second, Preset::Lz77).await.unwrap();

        assert_ne!(r1.id, r2.id);
        assert_eq!(r1.file_name, "compressed_lz77_a.jpg");
        assert_eq!(r2.file_name, "compressed_lz77_b.png");
        assert_eq!(r1.original_size, first.size());
        assert_eq!(r2.original_size, second.size());
        assert_eq!(image::guess_format(&r1.data).unwrap(), image::ImageFormat::Jpeg);
        assert_eq!(image::guess_format(&r2.data).unwrap(), image::ImageFormat::Png);

        // Re-running the first file gives the same bytes: nothing leaked between calls
        let again = service.compress_file(&first, Preset::Lz77).await.unwrap();
        assert_eq!(again.data, r1.data);
    }

    #[tokio::test]
    async fn test_pdf_routed_to_pdf_compressor() {
        let service = CompressionServiceImpl::new(&CompressorConfig::default());
        let file = SourceFile::from_bytes("report.pdf", sample_pdf());
        assert_eq!(file.mime_type, "application/pdf");

        let result = service.compress_file(&file, Preset::Lz77).await.unwrap();
        assert_eq!(result.category, MediaCategory::Pdf);
        assert_eq!(result.file_name, "compressed_lz77_report.pdf");
        assert!(result.compressed_size < result.original_size);
    }

    #[test]
    fn test_supported_categories() {
        let service = CompressionServiceImpl::new(&CompressorConfig::default());
        assert_eq!(
            service.supported_categories(),
            vec![MediaCategory::Image, MediaCategory::Video, MediaCategory::Pdf]
        );
    }
}
