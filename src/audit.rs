//! Audit events and sinks.
//!
//! Audit events are the only place matched sensitive values are recorded.
//! The diagnostic log never carries them.

use crate::error::{DlpError, DlpResult};
use crate::policy::Mode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Observe,
    Mask,
    Warn,
    Block,
}

/// One immutable fact about a decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    /// One category, or every blocked category for an enforce block
    pub categories: Vec<String>,
    pub action: AuditAction,
    /// Original matched values
    pub items: Vec<String>,
    pub request_id: Option<String>,
    pub mode: Mode,
}

impl AuditEvent {
    pub fn new(
        user_id: impl Into<String>,
        categories: Vec<String>,
        action: AuditAction,
        items: Vec<String>,
        request_id: Option<String>,
        mode: Mode,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            user_id: user_id.into(),
            categories,
            action,
            items,
            request_id,
            mode,
        }
    }

    /// The single category of a per-category event.
    pub fn category(&self) -> Option<&str> {
        match self.categories.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// Receives audit events, one call per event.
///
/// Sinks must not fail the request; write errors are logged by the sink.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every event recorded so far, in order.
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlAuditLog {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> DlpResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| DlpError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, event: &AuditEvent) -> DlpResult<()> {
        let line = serde_json::to_string(event)?;
        let mut writer = self.writer.lock().map_err(|_| DlpError::Backend {
            backend: "audit".to_string(),
            message: "audit writer lock poisoned".to_string(),
            source: None,
        })?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

impl AuditSink for JsonlAuditLog {
    fn record(&self, event: &AuditEvent) {
        if let Err(e) = self.append(event) {
            log::error!(
                "[AUDIT] Failed to write audit event to {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
