//! Data-loss-prevention policy and redaction engine for LLM requests.
//!
//! This library sits between an LLM client and its backend. It inspects
//! outgoing chat messages for sensitive data, resolves per-category and
//! per-model policy, and decides whether to allow, mask, or block each
//! request according to a global operating mode.
//!
//! # Features
//!
//! - **Policy Resolution**: Block or mask per category, scoped to models via allow/block patterns
//! - **Operating Modes**: Observe (log only), Warn (mask + notice), Enforce (block + mask)
//! - **Position-Safe Redaction**: Right-to-left span replacement with overlap resolution
//! - **Document Redaction**: Render → redact → stitch pipeline for PDFs via MuPDF and lopdf
//! - **Built-in Detectors**: Email, NANP phone, SSN, Luhn-checked cards, keys and credentials
//! - **Audit Trail**: One event per triggered category, in memory or as JSON lines
//!
//! # Architecture
//!
//! - [`domain`]: Match model and model-identifier pattern matching
//! - [`policy`]: Policies, policy resolution and configuration loading
//! - [`detect`]: Detector contracts and built-in detectors
//! - [`redaction`]: Text redaction and the document pipeline
//! - [`message`]: Chat message shapes, extraction and write-back
//! - [`engine`]: The mode decision engine
//! - [`handler`]: Host-facing hooks with fail-open behavior
//! - [`audit`]: Audit events and sinks
//! - [`error`]: Error handling
//!
//! # Quick Start
//!
//! ```
//! use dlp_guard::{DlpHandler, Message, PolicySet, RequestMetadata};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let handler = DlpHandler::builder(PolicySet::default()).build()?;
//!
//! let outcome = handler.pre_call_hook(
//!     "alice",
//!     "openai/gpt-4",
//!     &[Message::user("My credit card is 4111111111111111")],
//!     RequestMetadata::default(),
//! );
//! assert!(outcome.is_blocked());
//! # Ok(())
//! # }
//! ```
//!
//! # Examples
//!
//! ## Model-Scoped Policies
//!
//! ```
//! use dlp_guard::{Mode, PolicySet};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let policies = PolicySet::from_toml_str(r#"
//!     mode = "enforce"
//!
//!     [policies.email]
//!     action = "mask"
//!
//!     [policies.email.models]
//!     allow = ["self-hosted/.*"]
//! "#)?;
//!
//! assert_eq!(policies.mode, Mode::Enforce);
//! assert!(policies.applicable("email", "openai/gpt-4").is_some());
//! assert!(policies.applicable("email", "self-hosted/llama2").is_none());
//! # Ok(())
//! # }
//! ```
//!
//! ## Text Redaction
//!
//! ```
//! use dlp_guard::{redact, DetectionMap, Match};
//!
//! let text = "My email is john@example.com";
//! let mut detections = DetectionMap::new();
//! detections.push("email", Match::new("john@example.com", 12, 28));
//!
//! let outcome = redact(text, &detections);
//! assert_eq!(outcome.redacted_text, "My email is [REDACTED_EMAIL]");
//! ```
//!
//! ## Document Redaction
//!
//! ```no_run
//! use dlp_guard::DocumentRedactor;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input = std::fs::read("statement.pdf")?;
//! let output = DocumentRedactor::with_defaults().redact_document(&input);
//! std::fs::write("statement-redacted.pdf", output)?;
//! # Ok(())
//! # }
//! ```

// Public API
pub mod audit;
pub mod detect;
pub mod domain;
pub mod engine;
pub mod error;
pub mod handler;
pub mod message;
pub mod policy;
pub mod redaction;

// Re-exports for convenient access
pub use audit::{AuditAction, AuditEvent, AuditSink, JsonlAuditLog, MemoryAuditSink};
pub use detect::{DocumentDetector, ImageDetector, PatternDetector, PdfTextDetector, TextDetector};
pub use domain::{matches_model, DetectionMap, Match, ModelPattern};
pub use engine::{Decision, DecisionEngine};
pub use error::{DlpError, DlpResult};
pub use handler::{DlpHandler, HookOutcome};
pub use message::{ContentPart, Message, MessageContent, RequestMetadata};
pub use policy::{should_apply, Action, Mode, ModelRules, Policy, PolicyConfig, PolicySet};
pub use redaction::{redact, DocumentRedactor, RedactionOutcome};
