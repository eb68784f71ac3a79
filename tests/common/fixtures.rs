//! Test fixtures and PDF builders.
//!
//! Provides builders for creating test PDFs and request files with specific
//! content, following the Builder pattern for clean test setup.

use anyhow::Result;
use dlp_guard::{ContentPart, Message};
use printpdf::*;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Builder for creating multi-page test PDFs.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// # use anyhow::Result;
/// # fn main() -> Result<()> {
/// let pdf = TestPdfBuilder::new()
///     .with_title("Customer Record")
///     .with_line("Email: john@example.com")
///     .new_page()
///     .with_line("Nothing sensitive here")
///     .build(Path::new("/tmp/test.pdf"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TestPdfBuilder {
    title: String,
    pages: Vec<Vec<String>>,
    page_width: Mm,
    page_height: Mm,
}

impl TestPdfBuilder {
    /// Creates a new test PDF builder with one empty page.
    pub fn new() -> Self {
        Self {
            title: "Test Document".to_string(),
            pages: vec![Vec::new()],
            page_width: Mm(210.0),  // A4 width
            page_height: Mm(297.0), // A4 height
        }
    }

    /// Sets the document title, printed at the top of the first page.
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Adds a line of text to the current page.
    pub fn with_line(mut self, line: &str) -> Self {
        if let Some(page) = self.pages.last_mut() {
            page.push(line.to_string());
        }
        self
    }

    /// Starts a new page; following lines go there.
    pub fn new_page(mut self) -> Self {
        self.pages.push(Vec::new());
        self
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Builds the PDF and writes it to the specified path.
    pub fn build(self, output_path: &Path) -> Result<PathBuf> {
        let (doc, first_page, first_layer) = PdfDocument::new(
            &self.title,
            self.page_width,
            self.page_height,
            "Layer 1",
        );
        let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;

        for (index, lines) in self.pages.iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page, layer) = doc.add_page(self.page_width, self.page_height, "Layer 1");
                doc.get_page(page).get_layer(layer)
            };

            let mut y = 270.0;
            if index == 0 {
                layer.use_text(&self.title, 16.0, Mm(20.0), Mm(y), &font);
                y -= 15.0;
            }
            for line in lines {
                layer.use_text(line, 12.0, Mm(20.0), Mm(y), &font);
                y -= 10.0;
            }
        }

        doc.save(&mut BufWriter::new(fs::File::create(output_path)?))?;
        Ok(output_path.to_path_buf())
    }
}

impl Default for TestPdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A two-page customer record with an email on page one and an SSN on page two.
pub fn create_customer_record(path: &Path) -> Result<PathBuf> {
    TestPdfBuilder::new()
        .with_title("Customer Record")
        .with_line("Name: John Smith")
        .with_line("Email: john@example.com")
        .new_page()
        .with_line("Tax details")
        .with_line("SSN: 123-45-6789")
        .build(path)
}

/// A PDF with no sensitive data at all.
pub fn create_clean_document(path: &Path) -> Result<PathBuf> {
    TestPdfBuilder::new()
        .with_title("Meeting Notes")
        .with_line("Discussed the roadmap for next quarter.")
        .with_line("Action items are tracked separately.")
        .build(path)
}

/// Writes `messages` as a JSON message array.
pub fn write_messages(path: &Path, messages: &[Message]) -> Result<PathBuf> {
    fs::write(path, serde_json::to_string_pretty(messages)?)?;
    Ok(path.to_path_buf())
}

/// A single user message with plain string content.
pub fn user_text(text: &str) -> Vec<Message> {
    vec![Message::user(text)]
}

/// A user message with a text part and an inline PNG part.
pub fn user_text_with_image(text: &str) -> Vec<Message> {
    vec![Message::user_parts(vec![
        ContentPart::text(text),
        ContentPart::image_url("data:image/png;base64,iVBORw0KGgo="),
    ])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builder_pattern() {
        let builder = TestPdfBuilder::new()
            .with_title("Test")
            .with_line("one")
            .new_page()
            .with_line("two");

        assert_eq!(builder.title, "Test");
        assert_eq!(builder.page_count(), 2);
    }

    #[test]
    fn test_create_customer_record() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let pdf_path = temp_dir.path().join("record.pdf");

        create_customer_record(&pdf_path)?;

        assert!(pdf_path.exists());
        Ok(())
    }
}
