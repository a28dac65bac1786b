//! Image compression implementation

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageEncoder, ImageFormat};
use std::io::Cursor;
use tokio::task;

use crate::config::ImageLimits;
use crate::errors::{DomainError, DomainResult};
use super::Compressor;
use crate::domains::compression::types::{MediaCategory, Preset};

const MIN_QUALITY: f32 = 0.1;
const MIN_DIMENSION: u32 = 16;
const STEP_FACTOR: f32 = 0.9;

/// Parameters for one image compression call
#[derive(Debug, Clone)]
pub struct ImageSettings {
    /// Initial encoder quality, 0.0 - 1.0
    pub quality: f32,
    pub limits: ImageLimits,
}

/// Image compressor using the `image` crate: bounded resize plus
/// re-encoding in the original format until a size budget is met.
#[derive(Clone, Default)]
pub struct ImageCompressor {
    limits: ImageLimits,
}

impl ImageCompressor {
    pub fn new(limits: ImageLimits) -> Self {
        Self { limits }
    }

    pub fn settings_for(&self, preset: Preset) -> ImageSettings {
        ImageSettings {
            quality: preset.image_quality(),
            limits: self.limits.clone(),
        }
    }
}

#[async_trait]
impl Compressor for ImageCompressor {
    async fn can_handle(&self, mime_type: &str, extension: Option<&str>) -> bool {
        matches!(mime_type,
            "image/jpeg" | "image/png" | "image/gif" | "image/webp" | "image/tiff" | "image/bmp"
        ) || (mime_type == "application/octet-stream" && matches!(extension,
            Some("jpg") | Some("jpeg") | Some("png") | Some("gif") | Some("webp") | Some("tif") | Some("tiff") | Some("bmp")
        ))
    }

    async fn compress(
        &self,
        data: Vec<u8>,
        _mime_type: &str,
        preset: Preset,
    ) -> DomainResult<Vec<u8>> {
        let settings = self.settings_for(preset);
        log::debug!(
            "Image settings for preset {}: quality={:.2}, max_size={} bytes, max_dimension={}",
            preset, settings.quality, settings.limits.max_size_bytes, settings.limits.max_width_or_height
        );

        // Run image operations in a blocking task to avoid blocking the runtime
        let result = task::spawn_blocking(move || compress_image(&data, &settings))
            .await
            .map_err(|e| DomainError::Internal(format!("Task join error: {}", e)))
            .and_then(|r| r);

        result.map_err(|e| {
            log::error!("Image compression failed: {}", e);
            DomainError::Compression("Failed to compress image".to_string())
        })
    }

    fn category(&self) -> MediaCategory {
        MediaCategory::Image
    }

    fn compressor_name(&self) -> &'static str {
        "ImageCompressor"
    }
}

/// Decode, bound, and re-encode until the output fits the size budget and
/// is no larger than the input, or the iteration limit is hit.
pub fn compress_image(data: &[u8], settings: &ImageSettings) -> DomainResult<Vec<u8>> {
    let format = image::guess_format(data)
        .map_err(|e| DomainError::Internal(format!("Failed to detect image format: {}", e)))?;

    let mut img = image::load_from_memory_with_format(data, format)
        .map_err(|e| DomainError::Internal(format!("Failed to load image: {}", e)))?;

    let original_len = data.len() as u64;
    let budget = settings.limits.max_size_bytes;
    let max_dim = settings.limits.max_width_or_height.max(1);
    let (width, height) = img.dimensions();
    let mut resized = false;
    if width > max_dim || height > max_dim {
        img = img.resize(max_dim, max_dim, FilterType::Triangle);
        resized = true;
        log::debug!("Resized {}x{} to {}x{}", width, height, img.width(), img.height());
    }

    let mut quality = settings.quality.clamp(MIN_QUALITY, 1.0);
    let mut output = encode(&img, format, quality)?;
    let mut iteration = 0;

    while (output.len() as u64 > budget || output.len() as u64 > original_len)
        && iteration < settings.limits.max_iterations
    {
        let over_budget = output.len() as u64 > budget;
        let can_lower_quality = is_lossy(format) && quality > MIN_QUALITY;
        if !over_budget && !can_lower_quality {
            // Only quality can fix growth; nothing left to turn down
            break;
        }
        iteration += 1;

        if can_lower_quality {
            quality = (quality * STEP_FACTOR).max(MIN_QUALITY);
        }
        if over_budget {
            if let Some(smaller) = shrink(&img) {
                img = smaller;
                resized = true;
            }
        }

        output = encode(&img, format, quality)?;
        log::debug!(
            "Pass {}: {}x{} at quality {:.2} -> {} bytes",
            iteration, img.width(), img.height(), quality, output.len()
        );
    }

    if output.len() as u64 > original_len && !resized {
        log::debug!("Re-encoding grew {} to {} bytes, keeping the original", original_len, output.len());
        return Ok(data.to_vec());
    }

    if output.len() as u64 > budget {
        log::warn!(
            "Image still {} bytes after {} passes (budget {} bytes)",
            output.len(), iteration, budget
        );
    }

    Ok(output)
}

/// Scale both sides by one factor so the longer side drops by `STEP_FACTOR`,
/// stopping at `MIN_DIMENSION`. `None` once the image is that small.
fn shrink(img: &DynamicImage) -> Option<DynamicImage> {
    let (w, h) = img.dimensions();
    let longest = w.max(h);
    if longest <= MIN_DIMENSION {
        return None;
    }

    let target = ((longest as f32 * STEP_FACTOR) as u32).max(MIN_DIMENSION);
    let scale = target as f32 / longest as f32;
    let new_w = ((w as f32 * scale).round() as u32).max(1);
    let new_h = ((h as f32 * scale).round() as u32).max(1);
    Some(img.resize_exact(new_w, new_h, FilterType::Triangle))
}

fn is_lossy(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Jpeg | ImageFormat::WebP)
}

fn quality_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn encode(img: &DynamicImage, format: ImageFormat, quality: f32) -> DomainResult<Vec<u8>> {
    let mut output = Vec::new();

    match format {
        ImageFormat::Jpeg => {
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut output, quality_percent(quality));
            encoder.encode(&rgb, rgb.width(), rgb.height(), ColorType::Rgb8)
                .map_err(|e| DomainError::Internal(format!("JPEG encoding error: {}", e)))?;
        },
        ImageFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut output,
                CompressionType::Best,
                PngFilter::Adaptive,
            );
            let written = match img.color() {
                ColorType::L8 | ColorType::L16 => {
                    let luma = img.to_luma8();
                    encoder.write_image(&luma, luma.width(), luma.height(), ColorType::L8)
                }
                ColorType::La8 | ColorType::La16 => {
                    let luma = img.to_luma_alpha8();
                    encoder.write_image(&luma, luma.width(), luma.height(), ColorType::La8)
                }
                color if color.has_alpha() => {
                    let rgba = img.to_rgba8();
                    encoder.write_image(&rgba, rgba.width(), rgba.height(), ColorType::Rgba8)
                }
                _ => {
                    let rgb = img.to_rgb8();
                    encoder.write_image(&rgb, rgb.width(), rgb.height(), ColorType::Rgb8)
                }
            };
            written.map_err(|e| DomainError::Internal(format!("PNG encoding error: {}", e)))?;
        },
        ImageFormat::WebP => {
            #[cfg(feature = "webp")]
            {
                let source = if img.color().has_alpha() {
                    DynamicImage::ImageRgba8(img.to_rgba8())
                } else {
                    DynamicImage::ImageRgb8(img.to_rgb8())
                };
                let encoder = webp::Encoder::from_image(&source)
                    .map_err(|e| DomainError::Internal(format!("WebP encoding error: {}", e)))?;
                let encoded = encoder.encode(quality * 100.0);
                output.extend_from_slice(&encoded);
            }
            #[cfg(not(feature = "webp"))]
            {
                img.write_to(&mut Cursor::new(&mut output), ImageFormat::WebP)
                    .map_err(|e| DomainError::Internal(format!("WebP encoding error: {}", e)))?;
            }
        },
        other => {
            // GIF, BMP, TIFF: same format, quality does not apply
            img.write_to(&mut Cursor::new(&mut output), other)
                .map_err(|e| DomainError::Internal(format!("{:?} encoding error: {}", other, e)))?;
        }
    }

    Ok(output)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    /// Deterministic RGB noise, which PNG cannot shrink much
    pub(crate) fn noise_png(width: u32, height: u32, seed: u32) -> Vec<u8> {
        let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
        let img = RgbImage::from_fn(width, height, |_, _| {
            let mut next = || {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            };
            Rgb([next(), next(), next()])
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    pub(crate) fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
        jpeg_with_quality(width, height, 95)
    }

    fn jpeg_with_quality(width: u32, height: u32, quality: u8) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode(&img, width, height, ColorType::Rgb8)
            .unwrap();
        out
    }

    fn settings(quality: f32, max_size_bytes: u64, max_dim: u32) -> ImageSettings {
        ImageSettings {
            quality,
            limits: ImageLimits {
                max_size_bytes,
                max_width_or_height: max_dim,
                max_iterations: 10,
            },
        }
    }

    #[test]
    fn test_resize_respects_max_dimension_and_keeps_format() {
        let input = gradient_jpeg(400, 100);
        let output = compress_image(&input, &settings(0.6, 10 * 1024 * 1024, 200)).unwrap();

        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.dimensions(), (200, 50));
    }

    #[test]
    fn test_png_shrinks_to_budget() {
        let input = noise_png(256, 256, 7);
        let budget = (input.len() / 3) as u64;
        let output = compress_image(&input, &settings(0.7, budget, 1920)).unwrap();

        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Png);
        assert!(output.len() as u64 <= budget, "{} > {}", output.len(), budget);
    }

    #[test]
    fn test_low_quality_jpeg_never_grows() {
        let input = jpeg_with_quality(200, 200, 20);
        for preset in Preset::ALL {
            let output = compress_image(&input, &ImageCompressor::default().settings_for(preset)).unwrap();
            assert!(output.len() <= input.len(), "{}: {} > {}", preset, output.len(), input.len());
            assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
        }
    }

    #[test]
    fn test_grayscale_png_stays_grayscale() {
        let gray = GrayImage::from_fn(300, 300, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]));
        let mut input = Vec::new();
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut Cursor::new(&mut input), ImageFormat::Png)
            .unwrap();

        let output = compress_image(&input, &settings(0.7, 1024, 1920)).unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.color(), ColorType::L8);
    }

    #[test]
    fn test_shrinking_keeps_aspect_ratio_and_never_upscales() {
        let input = noise_png(400, 20, 11);
        let output = compress_image(&input, &settings(0.7, 1, 1920)).unwrap();
        let (w, h) = image::load_from_memory(&output).unwrap().dimensions();
        assert!(w < 400);
        let ratio = w as f32 / h as f32;
        assert!((ratio - 20.0).abs() < 2.0, "{}x{}", w, h);

        let tiny = noise_png(10, 10, 5);
        let output = compress_image(&tiny, &settings(0.7, 1, 1920)).unwrap();
        let (w, h) = image::load_from_memory(&output).unwrap().dimensions();
        assert!(w <= 10 && h <= 10, "{}x{}", w, h);
    }

    #[test]
    fn test_garbage_input_is_rejected() {
        let err = compress_image(b"definitely not an image", &settings(0.6, 1024, 1920)).unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }

    #[tokio::test]
    async fn test_compressor_reports_short_message_on_failure() {
        let compressor = ImageCompressor::default();
        let err = compressor
            .compress(b"GIF89a-truncated".to_vec(), "image/gif", Preset::Lz77)
            .await
            .unwrap_err();
        match err {
            DomainError::Compression(msg) => assert_eq!(msg, "Failed to compress image"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_can_handle() {
        let compressor = ImageCompressor::default();
        assert!(compressor.can_handle("image/png", Some("png")).await);
        assert!(compressor.can_handle("application/octet-stream", Some("jpeg")).await);
        assert!(!compressor.can_handle("image/svg+xml", Some("svg")).await);
        assert!(!compressor.can_handle("video/mp4", Some("mp4")).await);
    }
}
