//! The document redaction pipeline: detect, render, redact, stitch.

use super::{
    stitch_pages, DocumentContext, MupdfRenderer, PageImage, PageRedactor, PageRenderer,
    RegionFillRedactor, TextLayerLocator,
};
use crate::detect::{DocumentDetector, PatternDetector, PdfTextDetector};
use crate::error::DlpResult;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// What happened to each page of a processed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentReport {
    /// Pages the renderer reported for the document
    pub pages_total: usize,
    pub pages_redacted: usize,
    /// Pages kept as rendered because redaction failed
    pub pages_unredacted: usize,
    /// Pages left out because they could not be rendered
    pub pages_dropped: usize,
    /// True when the output is the input, byte for byte
    pub unchanged: bool,
}

impl DocumentReport {
    fn unchanged() -> Self {
        Self {
            unchanged: true,
            ..Self::default()
        }
    }
}

/// Output bytes of the pipeline together with its report.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub bytes: Vec<u8>,
    pub report: DocumentReport,
}

impl DocumentOutcome {
    fn original(document: &[u8]) -> Self {
        Self {
            bytes: document.to_vec(),
            report: DocumentReport::unchanged(),
        }
    }
}

/// Redacts paginated documents by rasterizing every page.
///
/// The output loses its text layer and any non-raster structure (forms,
/// annotations); in exchange, programmatic text and scanned content are
/// covered the same way.
#[derive(Clone)]
pub struct DocumentRedactor {
    detector: Arc<dyn DocumentDetector>,
    renderer: Arc<dyn PageRenderer>,
    redactor: Arc<dyn PageRedactor>,
}

impl DocumentRedactor {
    pub fn new(
        detector: Arc<dyn DocumentDetector>,
        renderer: Arc<dyn PageRenderer>,
        redactor: Arc<dyn PageRedactor>,
    ) -> Self {
        Self {
            detector,
            renderer,
            redactor,
        }
    }

    /// Built-in pattern detection over the text layer, MuPDF rendering and
    /// black fill over text-layer hits.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(PdfTextDetector::new(PatternDetector::new())),
            Arc::new(MupdfRenderer::new()),
            Arc::new(RegionFillRedactor::new(TextLayerLocator::new())),
        )
    }

    /// Redacts a document, returning the original bytes whenever the
    /// pipeline cannot produce a complete output.
    pub fn redact_document(&self, document: &[u8]) -> Vec<u8> {
        self.redact_document_with_report(document).bytes
    }

    pub fn redact_document_with_report(&self, document: &[u8]) -> DocumentOutcome {
        let run = panic::catch_unwind(AssertUnwindSafe(|| self.run(document)));
        match run {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                log::error!("[PDF] Document redaction failed, returning original: {}", e);
                DocumentOutcome::original(document)
            }
            Err(_) => {
                log::error!("[PDF] Document redaction panicked, returning original");
                DocumentOutcome::original(document)
            }
        }
    }

    fn run(&self, document: &[u8]) -> DlpResult<DocumentOutcome> {
        let detections = self.detector.detect(document);
        if detections.is_empty() {
            log::debug!("[PDF] No detections, document left unchanged");
            return Ok(DocumentOutcome::original(document));
        }
        log::info!(
            "[PDF] {} match(es) in {} categories, redacting document",
            detections.total_matches(),
            detections.len()
        );

        let rendered = self.renderer.render(document)?;
        let context = DocumentContext::new(document, &detections);

        let mut report = DocumentReport {
            pages_total: rendered.len(),
            ..DocumentReport::default()
        };
        let mut pages: Vec<PageImage> = Vec::with_capacity(rendered.len());

        for (position, page) in rendered.into_iter().enumerate() {
            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    log::error!("[PDF] Page {} failed to render, omitting it: {}", position + 1, e);
                    report.pages_dropped += 1;
                    continue;
                }
            };

            match self.redactor.redact_page(&page, &context) {
                Ok(image) => {
                    report.pages_redacted += 1;
                    pages.push(PageImage::new(page.index, image, page.scale));
                }
                Err(e) => {
                    log::warn!(
                        "[PDF] Page {} could not be redacted, keeping it UNREDACTED: {}",
                        page.index + 1,
                        e
                    );
                    report.pages_unredacted += 1;
                    pages.push(page);
                }
            }
        }

        if pages.is_empty() {
            log::error!("[PDF] No pages survived rendering, returning original");
            return Ok(DocumentOutcome::original(document));
        }

        let bytes = stitch_pages(&pages)?;
        Ok(DocumentOutcome { bytes, report })
    }
}

impl Default for DocumentRedactor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for DocumentRedactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRedactor").finish_non_exhaustive()
    }
}
