//! Common test utilities and helpers.
//!
//! This module provides shared functionality for all tests, including:
//! - Custom assertions
//! - Test fixtures and builders
//! - PDF inspection helpers

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;
pub mod pdf_helpers;

pub use assertions::*;
pub use fixtures::*;
pub use pdf_helpers::*;

use std::sync::{Mutex, MutexGuard};

/// Serializes MuPDF work across tests in one binary.
///
/// MuPDF font initialization is not thread-safe, so tests that render or
/// search pages hold this lock while they do.
static MUPDF_LOCK: Mutex<()> = Mutex::new(());

pub fn lock_mupdf() -> MutexGuard<'static, ()> {
    MUPDF_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
