//! The mode decision engine.
//!
//! For each request the engine merges text and image detections, classifies
//! every detected category through the policy set, and turns the result into
//! an allow, masked-allow or block decision according to the global mode.
//! The engine holds no per-request state and is shared across threads.

use crate::audit::{AuditAction, AuditEvent};
use crate::domain::DetectionMap;
use crate::message::{mask_messages, Message, RequestMetadata, TextBlob};
use crate::policy::{Action, Mode, PolicySet};
use serde::Serialize;
use std::sync::Arc;

/// Header attached to the payload when warn mode sees a violation.
pub const WARNING_HEADER: &str = "X-DLP-Warning";
pub const WARNING_VALUE: &str = "violations_detected";

/// The request being evaluated.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub user_id: &'a str,
    pub model_id: &'a str,
    pub messages: &'a [Message],
    /// Text extracted from `messages`; text detections refer to its offsets
    pub text: &'a TextBlob,
    pub metadata: &'a RequestMetadata,
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub blocked: bool,
    /// Reason shown to the caller when blocked
    pub message: Option<String>,
    /// The payload to forward, when it differs from the input
    pub modified_payload: Option<RequestMetadata>,
    /// Events in emission order
    pub audit_events: Vec<AuditEvent>,
}

impl Decision {
    fn allow() -> Self {
        Self {
            blocked: false,
            message: None,
            modified_payload: None,
            audit_events: Vec::new(),
        }
    }
}

/// Categories that triggered a policy, bucketed by action.
#[derive(Debug, Default)]
struct Classified {
    blocked: Vec<String>,
    masked: DetectionMap,
}

impl Classified {
    fn is_empty(&self) -> bool {
        self.blocked.is_empty() && self.masked.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DecisionEngine {
    policies: Arc<PolicySet>,
}

impl DecisionEngine {
    pub fn new(policies: Arc<PolicySet>) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    pub fn mode(&self) -> Mode {
        self.policies.mode
    }

    /// Decides what to do with `request`.
    ///
    /// `image_detections` are merged into `text_detections` by category
    /// before classification.
    pub fn decide(
        &self,
        request: &Request<'_>,
        text_detections: DetectionMap,
        image_detections: DetectionMap,
    ) -> Decision {
        let mut detections = text_detections;
        detections.merge(image_detections);
        detections.retain_enabled(self.policies.enabled_types.as_ref());

        if detections.is_empty() {
            return Decision::allow();
        }

        let classified = self.classify(&detections, request.model_id);
        log::debug!(
            "[ENGINE] mode={} blocked={:?} masked={:?}",
            self.mode(),
            classified.blocked,
            classified.masked.categories().collect::<Vec<_>>()
        );

        match self.mode() {
            Mode::Observe => self.observe(request, &detections, &classified),
            Mode::Warn => self.warn(request, &detections, classified),
            Mode::Enforce => self.enforce(request, classified),
        }
    }

    fn classify(&self, detections: &DetectionMap, model_id: &str) -> Classified {
        let mut classified = Classified::default();
        for (category, matches) in detections.iter() {
            let Some(policy) = self.policies.applicable(category, model_id) else {
                continue;
            };
            match policy.action {
                Action::Block => classified.blocked.push(category.to_string()),
                Action::Mask => classified.masked.extend(category, matches.iter().cloned()),
            }
        }
        classified
    }

    fn observe(
        &self,
        request: &Request<'_>,
        detections: &DetectionMap,
        classified: &Classified,
    ) -> Decision {
        let mut decision = Decision::allow();
        for category in detections.categories() {
            let applicable = classified.blocked.iter().any(|c| c == category)
                || classified.masked.contains(category);
            if applicable {
                decision.audit_events.push(self.event(
                    request,
                    vec![category.to_string()],
                    AuditAction::Observe,
                    detections.matched_texts(category),
                ));
            }
        }
        decision
    }

    fn warn(
        &self,
        request: &Request<'_>,
        detections: &DetectionMap,
        classified: Classified,
    ) -> Decision {
        let mut decision = Decision::allow();
        if classified.is_empty() {
            return decision;
        }

        let mut payload = request.metadata.clone();
        if !classified.masked.is_empty() {
            self.apply_masking(request, &classified.masked, &mut payload, &mut decision);
        }

        for category in &classified.blocked {
            decision.audit_events.push(self.event(
                request,
                vec![category.clone()],
                AuditAction::Warn,
                detections.matched_texts(category),
            ));
        }

        payload
            .extra_headers
            .insert(WARNING_HEADER.to_string(), WARNING_VALUE.to_string());
        log::info!(
            "[ENGINE] Violations detected for user {} in warn mode, request allowed",
            request.user_id
        );
        decision.modified_payload = Some(payload);
        decision
    }

    fn enforce(&self, request: &Request<'_>, classified: Classified) -> Decision {
        let mut decision = Decision::allow();

        if !classified.blocked.is_empty() {
            let names = classified.blocked.join(", ");
            log::info!(
                "[ENGINE] Blocking request for user {}: {}",
                request.user_id,
                names
            );
            decision.blocked = true;
            decision.message = Some(format!(
                "Request blocked: Detected sensitive data ({})",
                names
            ));
            decision.audit_events.push(self.event(
                request,
                classified.blocked,
                AuditAction::Block,
                Vec::new(),
            ));
            return decision;
        }

        if !classified.masked.is_empty() {
            let mut payload = request.metadata.clone();
            self.apply_masking(request, &classified.masked, &mut payload, &mut decision);
            decision.modified_payload = Some(payload);
        }
        decision
    }

    fn apply_masking(
        &self,
        request: &Request<'_>,
        masked: &DetectionMap,
        payload: &mut RequestMetadata,
        decision: &mut Decision,
    ) {
        payload.messages = Some(mask_messages(request.messages, request.text, masked));

        for category in masked.categories() {
            decision.audit_events.push(self.event(
                request,
                vec![category.to_string()],
                AuditAction::Mask,
                masked.matched_texts(category),
            ));
        }
    }

    fn event(
        &self,
        request: &Request<'_>,
        categories: Vec<String>,
        action: AuditAction,
        items: Vec<String>,
    ) -> AuditEvent {
        AuditEvent::new(
            request.user_id,
            categories,
            action,
            items,
            request.metadata.request_id.clone(),
            self.mode(),
        )
    }
}
