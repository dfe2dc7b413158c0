//! Text extraction from uploaded documents.
//!
//! Extraction is best-effort: the orchestrator downgrades any failure here to
//! empty text and keeps going, so extractors never need to be defensive about
//! what they return.

use anyhow::Result;

/// Opaque bytes-to-text collaborator.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// Extracts text from PDF documents.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| anyhow::anyhow!("pdf extraction failed: {e}"))
    }
}

/// Treats the upload as UTF-8 text. Used in tests and for plain-text
/// report uploads.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
