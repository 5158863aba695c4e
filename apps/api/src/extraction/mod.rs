//! PDF text extraction — the first stage of the analysis pipeline.
//!
//! A PDF with no embedded text layer is not an error: it is the signal that
//! the document is scanned and must be routed to direct-document analysis.
//! Structural parse failures are classified once here, at the boundary, so
//! the orchestrator never inspects error strings.

pub mod ocr;

use thiserror::Error;
use tracing::{debug, info};

/// Outcome of structural text extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentText {
    /// Embedded text was found.
    Extracted(String),
    /// The PDF parsed but contains no extractable text (scanned/image-only).
    NoTextLayer,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The PDF structure itself is broken in a way that typically means a
    /// scanner or exotic producer wrote it; routed to direct-document
    /// analysis rather than failing the request.
    #[error("malformed PDF structure: {0}")]
    MalformedStructure(String),

    /// Any other extraction failure. This propagates — it is a genuine
    /// defect, not a degradation case.
    #[error("PDF extraction failed: {0}")]
    Unreadable(String),
}

/// Extracts the embedded text from a PDF byte stream.
///
/// Returns `DocumentText::NoTextLayer` when extraction succeeds but yields
/// nothing but whitespace.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<DocumentText, ExtractionError> {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => {
            if text.trim().is_empty() {
                info!("PDF contains no extractable text layer, likely scanned");
                Ok(DocumentText::NoTextLayer)
            } else {
                debug!(chars = text.len(), "structural PDF text extraction succeeded");
                Ok(DocumentText::Extracted(text))
            }
        }
        Err(err) => {
            let message = err.to_string();
            if is_structural_failure(&message) {
                info!("PDF structure unparseable ({message}), routing to direct analysis");
                Err(ExtractionError::MalformedStructure(message))
            } else {
                Err(ExtractionError::Unreadable(message))
            }
        }
    }
}

/// Known markers of broken-producer/scanner output, matched once at this
/// boundary. Anything else counts as unreadable.
fn is_structural_failure(message: &str) -> bool {
    const MARKERS: &[&str] = &[
        "invalid file header",
        "no /root",
        "root object",
        "trailer",
        "xref",
        "could not parse",
    ];
    let lower = message.to_lowercase();
    MARKERS.iter().any(|marker| lower.contains(marker))
}
