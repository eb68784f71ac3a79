//! PDF manipulation and inspection helpers.

use anyhow::Result;
use dlp_guard::detect::PdfTextDetector;
use dlp_guard::PatternDetector;
use std::path::Path;

/// Extracts text from a PDF file, returning an error instead of panicking.
pub fn extract_text(pdf_path: &Path) -> Result<String> {
    let bytes = std::fs::read(pdf_path)?;
    extract_text_from_bytes(&bytes)
}

pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<String> {
    PdfTextDetector::<PatternDetector>::extract_text(bytes)
        .map_err(|e| anyhow::anyhow!("Failed to extract text: {}", e))
}

/// Text of a PDF, or an empty string when it has no readable text layer.
pub fn extract_text_lossy(bytes: &[u8]) -> String {
    extract_text_from_bytes(bytes).unwrap_or_default()
}

/// Counts occurrences of a pattern in a PDF.
pub fn count_pattern_in_pdf(pdf_path: &Path, pattern: &str) -> Result<usize> {
    let text = extract_text(pdf_path)?;
    Ok(text.matches(pattern).count())
}

/// Number of pages in a PDF held in memory.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    let doc = ::lopdf::Document::load_mem(bytes)?;
    Ok(doc.get_pages().len())
}

/// Validates that a PDF is loadable and has basic structure.
pub fn is_valid_pdf(bytes: &[u8]) -> bool {
    ::lopdf::Document::load_mem(bytes).is_ok()
}
