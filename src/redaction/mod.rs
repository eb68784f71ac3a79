//! Text redaction and the render → redact → stitch document pipeline.
//!
//! Text redaction ([`text`]) replaces located spans in a string. Documents
//! are handled by rasterizing each page ([`render`]), painting over the
//! sensitive regions of each page image ([`fill`]), and assembling the
//! images into a new PDF ([`stitch`]). [`document`] drives the pipeline and
//! owns its failure policy.

pub mod document;
pub mod fill;
pub mod render;
pub mod stitch;
pub mod text;

pub use document::{DocumentOutcome, DocumentRedactor, DocumentReport};
pub use fill::{RegionFillRedactor, TextLayerLocator};
pub use render::MupdfRenderer;
pub use stitch::stitch_pages;
pub use text::{placeholder, redact, RedactionOutcome};

use crate::domain::DetectionMap;
use crate::error::{DlpError, DlpResult};
use image::DynamicImage;
use once_cell::unsync::OnceCell;
use std::fmt;

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Default render scale; 3x is roughly 216 DPI.
pub const DEFAULT_RENDER_SCALE: f32 = 3.0;

/// One rasterized document page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Zero-based page position in the source document
    pub index: usize,
    pub image: DynamicImage,
    /// Pixels per PDF point
    pub scale: f32,
}

impl PageImage {
    pub fn new(index: usize, image: DynamicImage, scale: f32) -> Self {
        Self {
            index,
            image,
            scale,
        }
    }

    pub fn dpi(&self) -> f32 {
        self.scale * POINTS_PER_INCH
    }
}

/// An axis-aligned rectangle in page-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// What the page redactor knows about the document being processed.
///
/// One context is built per document and shared by every page, so anything
/// parsed from `document` here is parsed once.
pub struct DocumentContext<'a> {
    /// The original document bytes
    pub document: &'a [u8],
    /// Whole-document detections from the detect phase
    pub detections: &'a DetectionMap,
    parsed: OnceCell<Result<mupdf::Document, String>>,
}

impl<'a> DocumentContext<'a> {
    pub fn new(document: &'a [u8], detections: &'a DetectionMap) -> Self {
        Self {
            document,
            detections,
            parsed: OnceCell::new(),
        }
    }

    /// The document opened with MuPDF, loaded on first use.
    ///
    /// A failed load is remembered and reported again on later calls.
    pub fn mupdf_document(&self) -> DlpResult<&mupdf::Document> {
        let parsed = self.parsed.get_or_init(|| {
            mupdf::Document::from_bytes(self.document, "application/pdf").map_err(|e| e.to_string())
        });
        parsed.as_ref().map_err(|reason| DlpError::Backend {
            backend: "MuPDF".to_string(),
            message: format!("Failed to open PDF: {}", reason),
            source: None,
        })
    }
}

impl fmt::Debug for DocumentContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentContext")
            .field("document_len", &self.document.len())
            .field("detections", &self.detections)
            .field("parsed", &self.parsed.get().map(Result::is_ok))
            .finish()
    }
}

/// Rasterizes every page of a document.
///
/// The outer error means the document could not be opened at all; an inner
/// error means that single page failed to render.
pub trait PageRenderer: Send + Sync {
    fn render(&self, document: &[u8]) -> DlpResult<Vec<DlpResult<PageImage>>>;
}

/// Redacts one rendered page image.
pub trait PageRedactor: Send + Sync {
    fn redact_page(&self, page: &PageImage, context: &DocumentContext<'_>)
        -> DlpResult<DynamicImage>;
}

/// Finds the regions of a page image that hold sensitive data.
pub trait RegionLocator: Send + Sync {
    fn locate(&self, page: &PageImage, context: &DocumentContext<'_>) -> DlpResult<Vec<Region>>;
}
