//! PDF compression implementation

use async_trait::async_trait;
use lopdf::Document;
use tokio::task;

use crate::errors::{DomainError, DomainResult};
use super::Compressor;
use crate::domains::compression::types::{MediaCategory, PdfSettings, Preset};

/// PDF compressor rewriting the object graph with `lopdf`
pub struct PdfCompressor;

#[async_trait]
impl Compressor for PdfCompressor {
    async fn can_handle(&self, mime_type: &str, extension: Option<&str>) -> bool {
        mime_type == "application/pdf"
            || (mime_type == "application/octet-stream" && extension == Some("pdf"))
    }

    async fn compress(
        &self,
        data: Vec<u8>,
        _mime_type: &str,
        preset: Preset,
    ) -> DomainResult<Vec<u8>> {
        let settings = preset.pdf_settings();
        log::debug!("PDF settings for preset {}: {:?}", preset, settings);

        // Run PDF operations in a blocking task
        let result = task::spawn_blocking(move || repack_pdf(&data, settings))
            .await
            .map_err(|e| DomainError::Internal(format!("Task join error: {}", e)))
            .and_then(|r| r);

        result.map_err(|e| {
            log::error!("PDF compression failed: {}", e);
            DomainError::Compression("Failed to compress PDF".to_string())
        })
    }

    fn category(&self) -> MediaCategory {
        MediaCategory::Pdf
    }

    fn compressor_name(&self) -> &'static str {
        "PdfCompressor"
    }
}

/// Load, apply the rewrite flags, and serialize back to memory.
pub fn repack_pdf(data: &[u8], settings: PdfSettings) -> DomainResult<Vec<u8>> {
    let mut doc = Document::load_mem(data)
        .map_err(|e| DomainError::Internal(format!("Failed to load PDF: {}", e)))?;

    if doc.is_encrypted() {
        doc.decrypt(b"")
            .map_err(|e| DomainError::Internal(format!("PDF is encrypted and could not be decrypted: {:?}", e)))?;
        log::debug!("Decrypted PDF with empty password");
    }

    if settings.strip_metadata {
        strip_metadata(&mut doc);
    }

    if settings.prune_unused_objects {
        let pruned = doc.prune_objects();
        log::debug!("Pruned {} unreferenced objects", pruned.len());
    }

    let empty = doc.delete_zero_length_streams();
    if !empty.is_empty() {
        log::debug!("Deleted {} zero-length streams", empty.len());
    }

    if settings.compress_streams {
        doc.compress();
    }

    doc.renumber_objects();

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| DomainError::Internal(format!("Failed to save PDF: {}", e)))?;

    Ok(output)
}

/// Drop the document information dictionary and the catalog's XMP stream
fn strip_metadata(doc: &mut Document) {
    doc.trailer.remove(b"Info");

    let root_id = match doc.trailer.get(b"Root").and_then(|o| o.as_reference()) {
        Ok(id) => id,
        Err(_) => return,
    };
    if let Ok(catalog) = doc.get_object_mut(root_id).and_then(|o| o.as_dict_mut()) {
        catalog.remove(b"Metadata");
    }
}
