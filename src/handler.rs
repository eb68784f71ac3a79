//! The plugin-host boundary.
//!
//! [`DlpHandler::pre_call_hook`] is what an LLM proxy calls before forwarding
//! a request. It extracts text and inline images, runs the detectors, asks
//! the decision engine for a verdict and hands the audit events to the sink.
//! Any panic below this point is caught and the request passes unchanged.

use crate::audit::{AuditSink, JsonlAuditLog, NullAuditSink};
use crate::detect::{ImageDetector, PatternDetector, TextDetector};
use crate::domain::DetectionMap;
use crate::engine::{Decision, DecisionEngine, Request};
use crate::error::DlpResult;
use crate::message::{extract_images, extract_text, Message, RequestMetadata};
use crate::policy::{PolicyConfig, PolicySet};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

/// What the host should do with a request.
#[derive(Debug, Clone, PartialEq)]
pub struct HookOutcome {
    /// Set when the request is blocked
    pub error_message: Option<String>,
    /// Payload to forward; `None` when blocked
    pub metadata: Option<RequestMetadata>,
}

impl HookOutcome {
    fn pass(metadata: RequestMetadata) -> Self {
        Self {
            error_message: None,
            metadata: Some(metadata),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.error_message.is_some()
    }
}

/// Shared, read-only DLP state for one host process.
#[derive(Clone)]
pub struct DlpHandler {
    engine: DecisionEngine,
    text_detector: Arc<dyn TextDetector>,
    image_detector: Option<Arc<dyn ImageDetector>>,
    audit: Arc<dyn AuditSink>,
}

pub struct DlpHandlerBuilder {
    policies: PolicySet,
    text_detector: Option<Arc<dyn TextDetector>>,
    image_detector: Option<Arc<dyn ImageDetector>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl DlpHandlerBuilder {
    /// Replaces the built-in pattern detector.
    pub fn text_detector(mut self, detector: impl TextDetector + 'static) -> Self {
        self.text_detector = Some(Arc::new(detector));
        self
    }

    /// Enables detection in inline images (OCR or similar).
    pub fn image_detector(mut self, detector: impl ImageDetector + 'static) -> Self {
        self.image_detector = Some(Arc::new(detector));
        self
    }

    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Builds the handler.
    ///
    /// Without an explicit sink, events go to the configured audit log file,
    /// or nowhere if none is configured.
    pub fn build(self) -> DlpResult<DlpHandler> {
        let audit: Arc<dyn AuditSink> = match (self.audit, &self.policies.audit_log_path) {
            (Some(sink), _) => sink,
            (None, Some(path)) => Arc::new(JsonlAuditLog::open(path)?),
            (None, None) => Arc::new(NullAuditSink),
        };
        let text_detector = self.text_detector.unwrap_or_else(|| {
            Arc::new(PatternDetector::new().with_enabled_types(self.policies.enabled_types.clone()))
        });

        log::info!(
            "[HOOK] DLP handler ready: mode={}, {} policies",
            self.policies.mode,
            self.policies.policies.len()
        );
        Ok(DlpHandler {
            engine: DecisionEngine::new(Arc::new(self.policies)),
            text_detector,
            image_detector: self.image_detector,
            audit,
        })
    }
}

impl DlpHandler {
    pub fn builder(policies: PolicySet) -> DlpHandlerBuilder {
        DlpHandlerBuilder {
            policies,
            text_detector: None,
            image_detector: None,
            audit: None,
        }
    }

    /// Loads policies from `path` if it exists, otherwise uses the defaults.
    pub fn from_config_path(path: Option<&Path>) -> DlpResult<Self> {
        let policies = match path {
            Some(path) if path.exists() => PolicySet::from_file(path)?,
            Some(path) => {
                log::warn!(
                    "[HOOK] Config {} not found, using default policies",
                    path.display()
                );
                PolicyConfig::default().into_policy_set()?
            }
            None => PolicyConfig::default().into_policy_set()?,
        };
        Self::builder(policies).build()
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Evaluates a request and records its audit events.
    ///
    /// On internal failure the request is forwarded unchanged and the
    /// failure is logged.
    pub fn pre_call_hook(
        &self,
        user_id: &str,
        model_id: &str,
        messages: &[Message],
        metadata: RequestMetadata,
    ) -> HookOutcome {
        let evaluated = panic::catch_unwind(AssertUnwindSafe(|| {
            let decision = self.evaluate(user_id, model_id, messages, &metadata);
            self.record(&decision);
            decision
        }));

        let decision = match evaluated {
            Ok(decision) => decision,
            Err(_) => {
                log::error!("[HOOK] DLP evaluation panicked, forwarding request unchanged");
                return HookOutcome::pass(metadata);
            }
        };

        if decision.blocked {
            return HookOutcome {
                error_message: decision.message,
                metadata: None,
            };
        }
        HookOutcome::pass(decision.modified_payload.unwrap_or(metadata))
    }

    /// Runs detection and the decision engine without touching the sink.
    pub fn evaluate(
        &self,
        user_id: &str,
        model_id: &str,
        messages: &[Message],
        metadata: &RequestMetadata,
    ) -> Decision {
        let blob = extract_text(messages);
        let text_detections = if blob.is_empty() {
            DetectionMap::new()
        } else {
            self.text_detector.detect(&blob.text)
        };

        let mut image_detections = DetectionMap::new();
        if let Some(detector) = &self.image_detector {
            for image in extract_images(messages) {
                image_detections.merge(detector.detect(&image));
            }
        }

        let request = Request {
            user_id,
            model_id,
            messages,
            text: &blob,
            metadata,
        };
        self.engine.decide(&request, text_detections, image_detections)
    }

    /// Hands the decision's audit events to the sink, in order.
    pub fn record(&self, decision: &Decision) {
        for event in &decision.audit_events {
            self.audit.record(event);
        }
    }

    /// Response hook; responses are not inspected.
    pub fn post_call_hook(
        &self,
        _user_id: &str,
        _model_id: &str,
        _messages: &[Message],
        _response: &Value,
    ) -> Option<Value> {
        None
    }
}

impl std::fmt::Debug for DlpHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DlpHandler")
            .field("engine", &self.engine)
            .field("image_detection", &self.image_detector.is_some())
            .finish_non_exhaustive()
    }
}
