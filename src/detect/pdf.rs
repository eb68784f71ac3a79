//! Document detection over the PDF text layer.

use super::{DocumentDetector, PatternDetector, TextDetector};
use crate::domain::DetectionMap;
use crate::error::{DlpError, DlpResult};
use std::panic;

/// Runs a text detector over the text extracted from a PDF.
///
/// Offsets in the returned map refer to the extracted text, not to page
/// coordinates. Scanned pages with no text layer contribute nothing here;
/// pair this with an OCR-backed detector for those.
#[derive(Debug, Clone, Default)]
pub struct PdfTextDetector<D = PatternDetector> {
    inner: D,
}

impl<D: TextDetector> PdfTextDetector<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    /// Extracts the text layer of a PDF held in memory.
    pub fn extract_text(document: &[u8]) -> DlpResult<String> {
        // pdf-extract panics on some malformed documents
        let extracted = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(document))
            .map_err(|_| DlpError::Backend {
                backend: "pdf-extract".to_string(),
                message: "text extraction panicked".to_string(),
                source: None,
            })?;

        extracted.map_err(|e| DlpError::Backend {
            backend: "pdf-extract".to_string(),
            message: e.to_string(),
            source: None,
        })
    }
}

impl<D: TextDetector> DocumentDetector for PdfTextDetector<D> {
    fn detect(&self, document: &[u8]) -> DetectionMap {
        match Self::extract_text(document) {
            Ok(text) => self.inner.detect(&text),
            Err(e) => {
                log::warn!("[DETECT] PDF text extraction failed, treating as no detections: {}", e);
                DetectionMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_input_yields_empty_map() {
        let detector = PdfTextDetector::new(PatternDetector::new());
        assert!(detector.detect(b"not a pdf at all").is_empty());
    }
}
