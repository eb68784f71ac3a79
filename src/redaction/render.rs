//! Page rasterization with MuPDF.

use super::{PageImage, PageRenderer, DEFAULT_RENDER_SCALE};
use crate::error::{DlpError, DlpResult};
use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Document, Matrix, Pixmap};

/// Renders PDF pages to RGB images using MuPDF.
#[derive(Debug, Clone)]
pub struct MupdfRenderer {
    scale: f32,
}

impl MupdfRenderer {
    /// Creates a renderer at the default scale (~216 DPI).
    pub fn new() -> Self {
        Self {
            scale: DEFAULT_RENDER_SCALE,
        }
    }

    /// Sets the render scale in pixels per PDF point.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    fn render_page(&self, doc: &Document, page_idx: i32) -> DlpResult<PageImage> {
        let page_no = page_idx as usize + 1;
        let page = doc.load_page(page_idx).map_err(|e| DlpError::Render {
            page: page_no,
            message: format!("failed to load page: {}", e),
        })?;

        let matrix = Matrix::new_scale(self.scale, self.scale);
        let pixmap = page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), false, true)
            .map_err(|e| DlpError::Render {
                page: page_no,
                message: format!("failed to rasterize: {}", e),
            })?;

        let image = pixmap_to_rgb(&pixmap).ok_or_else(|| DlpError::Render {
            page: page_no,
            message: "pixmap has an unexpected layout".to_string(),
        })?;

        Ok(PageImage::new(
            page_idx as usize,
            DynamicImage::ImageRgb8(image),
            self.scale,
        ))
    }
}

impl Default for MupdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRenderer for MupdfRenderer {
    fn render(&self, document: &[u8]) -> DlpResult<Vec<DlpResult<PageImage>>> {
        let doc = Document::from_bytes(document, "application/pdf").map_err(|e| {
            DlpError::PdfProcessing {
                message: "Failed to open PDF with MuPDF".to_string(),
                page: None,
                source: Some(Box::new(e)),
            }
        })?;

        let page_count = doc.page_count().map_err(|e| DlpError::Backend {
            backend: "MuPDF".to_string(),
            message: format!("Failed to get page count: {}", e),
            source: Some(Box::new(e)),
        })?;

        Ok((0..page_count)
            .map(|page_idx| self.render_page(&doc, page_idx))
            .collect())
    }
}

/// Copies the color channels of a pixmap into an RGB image, honoring stride.
fn pixmap_to_rgb(pixmap: &Pixmap) -> Option<RgbImage> {
    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let channels = pixmap.n() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();

    if channels < 3 || stride < width * channels || samples.len() < stride * height {
        return None;
    }

    let mut rgb = Vec::with_capacity(width * height * 3);
    for row in samples.chunks(stride).take(height) {
        for pixel in row[..width * channels].chunks(channels) {
            rgb.extend_from_slice(&pixel[..3]);
        }
    }

    RgbImage::from_raw(width as u32, height as u32, rgb)
}
