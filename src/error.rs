//! Error types for the DLP engine.
//!
//! Per-request work never fails outward: detection, pattern, and page
//! failures are recovered where they happen and only logged. These errors
//! surface from construction-time APIs (configuration, audit sinks) and
//! from the internal helpers whose callers decide how to recover.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for DLP operations.
pub type DlpResult<T> = Result<T, DlpError>;

/// Error type for all DLP operations.
#[derive(Debug, Error)]
pub enum DlpError {
    /// Error occurred while reading or writing files
    #[error("IO error for path '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// Model pattern or detector regex failed to compile
    #[error("Pattern error for '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    /// Error occurred while reading or assembling a PDF
    #[error("PDF processing error{}: {message}", page_suffix(.page))]
    PdfProcessing {
        message: String,
        page: Option<usize>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A document page could not be rasterized
    #[error("Failed to render page {page}: {message}")]
    Render { page: usize, message: String },

    /// A page or attachment image could not be decoded or redacted
    #[error("Image processing error: {message}")]
    ImageProcessing { message: String },

    /// Invalid parameters passed to an operation
    #[error("Invalid input for '{parameter}': {reason}")]
    InvalidInput { parameter: String, reason: String },

    /// Backend-specific error (MuPDF, lopdf, serde, ...)
    #[error("{backend} backend error: {message}")]
    Backend {
        backend: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

fn page_suffix(page: &Option<usize>) -> String {
    match page {
        Some(p) => format!(" on page {}", p),
        None => String::new(),
    }
}

impl DlpError {
    /// Shorthand for a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Shorthand for an image processing error.
    pub fn image(message: impl Into<String>) -> Self {
        Self::ImageProcessing {
            message: message.into(),
        }
    }
}

impl From<io::Error> for DlpError {
    fn from(err: io::Error) -> Self {
        Self::Backend {
            backend: "std::io".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<regex::Error> for DlpError {
    fn from(err: regex::Error) -> Self {
        Self::Pattern {
            pattern: "<unknown>".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<lopdf::Error> for DlpError {
    fn from(err: lopdf::Error) -> Self {
        Self::PdfProcessing {
            message: err.to_string(),
            page: None,
            source: None,
        }
    }
}

impl From<image::ImageError> for DlpError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for DlpError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config {
            reason: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DlpError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            reason: err.to_string(),
        }
    }
}
