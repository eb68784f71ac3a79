//! Detector contracts and built-in detectors.
//!
//! Detectors locate sensitive data and return a [`DetectionMap`]. They never
//! fail outward: a detector that hits an internal error logs it and returns
//! an empty map, so a broken detector degrades to "nothing found" for its
//! source only.

pub mod patterns;
pub mod pdf;
pub mod phone;

pub use patterns::{PatternDetector, Recognizer, RegexRecognizer};
pub use pdf::PdfTextDetector;
pub use phone::PhoneRecognizer;

use crate::domain::DetectionMap;

/// Finds sensitive data in a text blob. Offsets are byte offsets into `text`.
pub trait TextDetector: Send + Sync {
    fn detect(&self, text: &str) -> DetectionMap;
}

/// Finds sensitive data in an encoded image (PNG, JPEG, ...).
pub trait ImageDetector: Send + Sync {
    fn detect(&self, image: &[u8]) -> DetectionMap;
}

/// Finds sensitive data anywhere in a paginated document.
pub trait DocumentDetector: Send + Sync {
    fn detect(&self, document: &[u8]) -> DetectionMap;
}

impl<F> TextDetector for F
where
    F: Fn(&str) -> DetectionMap + Send + Sync,
{
    fn detect(&self, text: &str) -> DetectionMap {
        self(text)
    }
}

impl<F> ImageDetector for F
where
    F: Fn(&[u8]) -> DetectionMap + Send + Sync,
{
    fn detect(&self, image: &[u8]) -> DetectionMap {
        self(image)
    }
}

/// A detector that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDetections;

impl TextDetector for NoDetections {
    fn detect(&self, _text: &str) -> DetectionMap {
        DetectionMap::new()
    }
}

impl ImageDetector for NoDetections {
    fn detect(&self, _image: &[u8]) -> DetectionMap {
        DetectionMap::new()
    }
}

impl DocumentDetector for NoDetections {
    fn detect(&self, _document: &[u8]) -> DetectionMap {
        DetectionMap::new()
    }
}
