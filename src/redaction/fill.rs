//! Opaque fill redaction of page images.

use super::{DocumentContext, PageImage, PageRedactor, Region, RegionLocator};
use crate::error::{DlpError, DlpResult};
use image::{DynamicImage, Rgb};
use mupdf::Quad;
use std::collections::BTreeSet;

/// Paints solid rectangles over every region its locator reports.
#[derive(Debug, Clone)]
pub struct RegionFillRedactor<L> {
    locator: L,
    fill: Rgb<u8>,
}

impl<L: RegionLocator> RegionFillRedactor<L> {
    /// Creates a redactor that fills with black.
    pub fn new(locator: L) -> Self {
        Self {
            locator,
            fill: Rgb([0, 0, 0]),
        }
    }

    pub fn with_fill(mut self, fill: Rgb<u8>) -> Self {
        self.fill = fill;
        self
    }
}

impl<L: RegionLocator> PageRedactor for RegionFillRedactor<L> {
    fn redact_page(
        &self,
        page: &PageImage,
        context: &DocumentContext<'_>,
    ) -> DlpResult<DynamicImage> {
        let regions = self.locator.locate(page, context)?;
        let mut image = page.image.to_rgb8();
        let (width, height) = image.dimensions();

        for region in &regions {
            let x_end = region.x.saturating_add(region.width).min(width);
            let y_end = region.y.saturating_add(region.height).min(height);
            for y in region.y.min(height)..y_end {
                for x in region.x.min(width)..x_end {
                    image.put_pixel(x, y, self.fill);
                }
            }
        }

        if !regions.is_empty() {
            log::debug!(
                "[PDF] Filled {} region(s) on page {}",
                regions.len(),
                page.index + 1
            );
        }
        Ok(DynamicImage::ImageRgb8(image))
    }
}

/// Locates detected values on a page through the PDF text layer.
///
/// Each detected value is searched for on the page with MuPDF, line by line,
/// and the hit quads are scaled into page-image pixels. Values that only
/// exist as pixels (scanned pages) are not found here.
#[derive(Debug, Clone)]
pub struct TextLayerLocator {
    /// Maximum search hits per value per page
    max_hits: u32,
    /// Extra pixels added around each hit
    padding: u32,
}

impl TextLayerLocator {
    pub fn new() -> Self {
        Self {
            max_hits: 100,
            padding: 2,
        }
    }

    pub fn with_max_hits(mut self, max_hits: u32) -> Self {
        self.max_hits = max_hits;
        self
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    /// Distinct non-empty lines of every detected value.
    fn needles(context: &DocumentContext<'_>) -> BTreeSet<String> {
        context
            .detections
            .iter()
            .flat_map(|(_, matches)| matches.iter())
            .flat_map(|m| m.text.lines())
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn quad_to_region(&self, quad: &Quad, scale: f32) -> Region {
        let x0 = quad.ul.x.min(quad.ll.x).min(quad.ur.x).min(quad.lr.x);
        let y0 = quad.ul.y.min(quad.ll.y).min(quad.ur.y).min(quad.lr.y);
        let x1 = quad.ul.x.max(quad.ll.x).max(quad.ur.x).max(quad.lr.x);
        let y1 = quad.ul.y.max(quad.ll.y).max(quad.ur.y).max(quad.lr.y);

        let pad = self.padding as f32;
        let left = (x0 * scale - pad).max(0.0);
        let top = (y0 * scale - pad).max(0.0);
        let right = (x1 * scale + pad).max(left);
        let bottom = (y1 * scale + pad).max(top);

        Region::new(
            left.floor() as u32,
            top.floor() as u32,
            (right - left).ceil() as u32,
            (bottom - top).ceil() as u32,
        )
    }
}

impl Default for TextLayerLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionLocator for TextLayerLocator {
    fn locate(&self, page: &PageImage, context: &DocumentContext<'_>) -> DlpResult<Vec<Region>> {
        let needles = Self::needles(context);
        if needles.is_empty() {
            return Ok(Vec::new());
        }

        let page_no = page.index + 1;
        let mu_page = context
            .mupdf_document()?
            .load_page(page.index as i32)
            .map_err(|e| DlpError::PdfProcessing {
                message: format!("Failed to load page {}", page_no),
                page: Some(page_no),
                source: Some(Box::new(e)),
            })?;

        let mut regions = Vec::new();
        for needle in &needles {
            let hits = mu_page
                .search(needle, self.max_hits)
                .map_err(|e| DlpError::Backend {
                    backend: "MuPDF".to_string(),
                    message: format!("Search failed on page {}", page_no),
                    source: Some(Box::new(e)),
                })?;
            regions.extend(hits.iter().map(|quad| self.quad_to_region(quad, page.scale)));
        }
        Ok(regions)
    }
}
