//! Custom assertions for DLP testing.
//!
//! Provides domain-specific assertions that make tests more readable
//! and provide better error messages.

use super::pdf_helpers::{extract_text_lossy, is_valid_pdf, page_count};
use dlp_guard::{AuditAction, AuditEvent, HookOutcome, Message, MessageContent};

/// Asserts that a value no longer appears in a PDF's text layer.
///
/// # Panics
/// Panics if the value is still found in the extracted text.
pub fn assert_redacted(pdf: &[u8], value: &str) {
    let text = extract_text_lossy(pdf);
    assert!(
        !text.contains(value),
        "'{}' should be redacted but was found in output PDF.\nExtracted text length: {} chars",
        value,
        text.len()
    );
}

/// Asserts that a PDF loads and has the expected number of pages.
///
/// # Panics
/// Panics if the PDF is unreadable or the page count differs.
pub fn assert_valid_pdf(pdf: &[u8], expected_pages: usize) {
    assert!(!pdf.is_empty(), "PDF should not be empty");
    assert!(is_valid_pdf(pdf), "PDF should load with lopdf");
    let pages = page_count(pdf).expect("page count");
    assert_eq!(
        pages, expected_pages,
        "PDF should have {} page(s), found {}",
        expected_pages, pages
    );
}

/// Plain text of every message, in order.
pub fn message_texts(messages: &[Message]) -> Vec<String> {
    let mut texts = Vec::new();
    for message in messages {
        match &message.content {
            Some(MessageContent::Text(text)) => texts.push(text.clone()),
            Some(MessageContent::Parts(parts)) => {
                for part in parts {
                    if let dlp_guard::ContentPart::Text { text } = part {
                        texts.push(text.clone());
                    }
                }
            }
            None => {}
        }
    }
    texts
}

/// Asserts the hook forwarded masked messages and returns their texts.
///
/// # Panics
/// Panics if the request was blocked or carries no replacement messages.
pub fn assert_masked(outcome: &HookOutcome) -> Vec<String> {
    assert!(
        !outcome.is_blocked(),
        "request should be allowed, got block: {:?}",
        outcome.error_message
    );
    let messages = outcome
        .metadata
        .as_ref()
        .and_then(|m| m.messages.as_ref())
        .expect("masked request should carry replacement messages");
    message_texts(messages)
}

/// Actions of `events`, in order.
pub fn actions(events: &[AuditEvent]) -> Vec<AuditAction> {
    events.iter().map(|e| e.action).collect()
}
