//! PDF text extraction.
//!
//! The upload allow-list currently admits PDFs only; this module turns raw
//! PDF bytes into plain UTF-8 text for the chunker.

use crate::error::ChatError;

/// The only content type accepted for uploads.
pub const MIME_PDF: &str = "application/pdf";

/// Extract plain text from PDF bytes.
pub fn pdf_text(bytes: &[u8]) -> Result<String, ChatError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ChatError::Internal(format!("PDF extraction failed: {}", e)))
}
