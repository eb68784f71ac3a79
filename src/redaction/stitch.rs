//! Assembly of page images into an image-only PDF.

use super::PageImage;
use crate::error::{DlpError, DlpResult};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Builds a PDF with one page per image, in the given order.
///
/// Each page is sized so the image prints at its render DPI, which keeps the
/// original page dimensions. The output carries no text layer.
pub fn stitch_pages(pages: &[PageImage]) -> DlpResult<Vec<u8>> {
    if pages.is_empty() {
        return Err(DlpError::InvalidInput {
            parameter: "pages".to_string(),
            reason: "cannot build a PDF with no pages".to_string(),
        });
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let page_id = add_page(&mut doc, pages_id, page)?;
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| DlpError::PdfProcessing {
            message: format!("Failed to write stitched PDF: {}", e),
            page: None,
            source: None,
        })?;

    log::debug!("[PDF] Stitched {} page(s), {} bytes", pages.len(), bytes.len());
    Ok(bytes)
}

fn add_page(doc: &mut Document, pages_id: ObjectId, page: &PageImage) -> DlpResult<ObjectId> {
    let rgb = page.image.to_rgb8();
    let (px_width, px_height) = rgb.dimensions();
    if px_width == 0 || px_height == 0 {
        return Err(DlpError::PdfProcessing {
            message: "page image is empty".to_string(),
            page: Some(page.index + 1),
            source: None,
        });
    }

    // MediaBox in points; integer sizes keep the page dictionary simple
    let scale = if page.scale > 0.0 { page.scale } else { 1.0 };
    let width = ((px_width as f32 / scale).round() as i64).max(1);
    let height = ((px_height as f32 / scale).round() as i64).max(1);

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => px_width as i64,
            "Height" => px_height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content.encode().map_err(|e| DlpError::PdfProcessing {
        message: format!("Failed to encode page content: {}", e),
        page: Some(page.index + 1),
        source: None,
    })?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    });
    Ok(page_id)
}
