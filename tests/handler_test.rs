//! End-to-end tests of the request hook.
//!
//! Runs chat requests through the handler with the built-in detector and
//! checks decisions, payload rewriting and audit output for every mode.

use dlp_guard::engine::{WARNING_HEADER, WARNING_VALUE};
use dlp_guard::{
    AuditAction, DetectionMap, DlpHandler, Match, MemoryAuditSink, Message, Mode, PolicySet,
    RequestMetadata,
};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

mod common;
use common::*;

const CARD_TEXT: &str = "My credit card is 4111111111111111";
const EMAIL_TEXT: &str = "My email is john@example.com";

fn handler(mode: Mode) -> (DlpHandler, Arc<MemoryAuditSink>) {
    let sink = Arc::new(MemoryAuditSink::new());
    let handler = DlpHandler::builder(PolicySet::default().with_mode(mode))
        .audit_sink(sink.clone())
        .build()
        .unwrap();
    (handler, sink)
}

fn hook(handler: &DlpHandler, messages: &[Message]) -> dlp_guard::HookOutcome {
    handler.pre_call_hook(
        "alice",
        "openai/gpt-4",
        messages,
        RequestMetadata::with_request_id("call-42"),
    )
}

mod modes {
    use super::*;

    #[test]
    fn test_observe_never_changes_the_request() {
        let (handler, sink) = handler(Mode::Observe);
        let messages = user_text(CARD_TEXT);
        let outcome = hook(&handler, &messages);

        assert!(!outcome.is_blocked());
        assert_eq!(outcome.metadata, Some(RequestMetadata::with_request_id("call-42")));
        assert_eq!(actions(&sink.events()), vec![AuditAction::Observe]);
        assert_eq!(sink.events()[0].items, vec!["4111111111111111"]);
    }

    #[test]
    fn test_observe_ignores_unknown_and_disabled_categories() {
        let sink = Arc::new(MemoryAuditSink::new());
        let policies = PolicySet::default()
            .with_mode(Mode::Observe)
            .with_policy("phone", dlp_guard::Policy::mask().disabled());
        let handler = DlpHandler::builder(policies)
            .text_detector(|text: &str| {
                let mut map = DetectionMap::new();
                for (category, needle) in [
                    ("email", "john@example.com"),
                    ("badge_number", "B-7781"),
                    ("phone", "555-234-5678"),
                ] {
                    if let Some(start) = text.find(needle) {
                        map.push(category, Match::new(needle, start, start + needle.len()));
                    }
                }
                map
            })
            .audit_sink(sink.clone())
            .build()
            .unwrap();

        let messages = user_text("john@example.com, badge B-7781, phone 555-234-5678");
        let outcome = hook(&handler, &messages);

        assert!(!outcome.is_blocked());
        assert_eq!(outcome.metadata, Some(RequestMetadata::with_request_id("call-42")));
        let events = sink.events();
        assert_eq!(actions(&events), vec![AuditAction::Observe]);
        assert_eq!(events[0].categories, vec!["email"]);
        assert_eq!(events[0].items, vec!["john@example.com"]);
    }

    #[test]
    fn test_empty_enabled_types_still_inspects() {
        let sink = Arc::new(MemoryAuditSink::new());
        let policies = PolicySet::from_toml_str("enabled_types = []\nmode = \"enforce\"").unwrap();
        let handler = DlpHandler::builder(policies)
            .audit_sink(sink.clone())
            .build()
            .unwrap();

        assert!(hook(&handler, &user_text(CARD_TEXT)).is_blocked());
        assert_eq!(actions(&sink.events()), vec![AuditAction::Block]);
    }

    #[test]
    fn test_warn_marks_but_allows() {
        let (handler, sink) = handler(Mode::Warn);
        let outcome = hook(&handler, &user_text(CARD_TEXT));

        assert!(!outcome.is_blocked());
        let metadata = outcome.metadata.unwrap();
        assert_eq!(
            metadata.extra_headers.get(WARNING_HEADER).map(String::as_str),
            Some(WARNING_VALUE)
        );
        assert!(metadata.messages.is_none());
        assert_eq!(actions(&sink.events()), vec![AuditAction::Warn]);
    }

    #[test]
    fn test_enforce_blocks() {
        let (handler, sink) = handler(Mode::Enforce);
        let outcome = hook(&handler, &user_text(CARD_TEXT));

        assert!(outcome.is_blocked());
        assert!(outcome.error_message.unwrap().contains("credit_card"));
        assert!(outcome.metadata.is_none());

        let events = sink.events();
        assert_eq!(actions(&events), vec![AuditAction::Block]);
        assert_eq!(events[0].request_id.as_deref(), Some("call-42"));
        assert_eq!(events[0].mode, Mode::Enforce);
    }

    #[test]
    fn test_enforce_masks_email() {
        let (handler, sink) = handler(Mode::Enforce);
        let outcome = hook(&handler, &user_text(EMAIL_TEXT));

        let texts = assert_masked(&outcome);
        assert_eq!(texts, vec!["My email is [REDACTED_EMAIL]"]);

        let events = sink.events();
        assert_eq!(actions(&events), vec![AuditAction::Mask]);
        assert_eq!(events[0].items, vec!["john@example.com"]);
    }

    #[test]
    fn test_clean_request_has_no_events_in_any_mode() {
        for mode in [Mode::Observe, Mode::Warn, Mode::Enforce] {
            let (handler, sink) = handler(mode);
            let outcome = hook(&handler, &user_text("What is the capital of France?"));
            assert!(!outcome.is_blocked());
            assert!(sink.is_empty(), "mode {} emitted events", mode);
        }
    }
}

mod messages {
    use super::*;

    #[test]
    fn test_masks_each_message_in_place() {
        let (handler, _) = handler(Mode::Enforce);
        let messages = vec![
            Message::new("system", dlp_guard::MessageContent::Text("Be brief.".into())),
            Message::user("Reply to jane@example.org"),
            Message::user("and cc john@example.com too"),
        ];
        let texts = assert_masked(&hook(&handler, &messages));
        assert_eq!(
            texts,
            vec![
                "Be brief.",
                "Reply to [REDACTED_EMAIL]",
                "and cc [REDACTED_EMAIL] too",
            ]
        );
    }

    #[test]
    fn test_multipart_content_keeps_images() {
        let (handler, _) = handler(Mode::Enforce);
        let messages = user_text_with_image("send it to john@example.com");
        let outcome = hook(&handler, &messages);

        let forwarded = outcome.metadata.unwrap().messages.unwrap();
        match &forwarded[0].content {
            Some(dlp_guard::MessageContent::Parts(parts)) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0], dlp_guard::ContentPart::text("send it to [REDACTED_EMAIL]"));
                assert!(matches!(parts[1], dlp_guard::ContentPart::ImageUrl { .. }));
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_unknown_content_parts_are_forwarded() {
        let (handler, _) = handler(Mode::Enforce);
        let messages: Vec<Message> = serde_json::from_value(serde_json::json!([{
            "role": "user",
            "content": [
                {"type": "text", "text": "mail john@example.com"},
                {"type": "input_audio", "input_audio": {"data": "AAEC", "format": "wav"}}
            ]
        }]))
        .unwrap();

        let forwarded = hook(&handler, &messages).metadata.unwrap().messages.unwrap();
        let round = serde_json::to_value(&forwarded).unwrap();
        assert_eq!(round[0]["content"][0]["text"], "mail [REDACTED_EMAIL]");
        assert_eq!(round[0]["content"][1]["type"], "input_audio");
        assert_eq!(round[0]["content"][1]["input_audio"]["format"], "wav");
    }

    #[test]
    fn test_image_detector_sees_inline_images() {
        let sink = Arc::new(MemoryAuditSink::new());
        let handler = DlpHandler::builder(PolicySet::default())
            .image_detector(|bytes: &[u8]| {
                let mut map = DetectionMap::new();
                if bytes.starts_with(b"\x89PNG") {
                    map.push("ssn", Match::new("123-45-6789", 0, 11));
                }
                map
            })
            .audit_sink(sink.clone())
            .build()
            .unwrap();

        let outcome = hook(&handler, &user_text_with_image("what is this form?"));
        assert!(outcome.is_blocked());
        assert_eq!(sink.events()[0].categories, vec!["ssn"]);
    }
}

mod audit_log {
    use super::*;

    #[test]
    fn test_configured_audit_log_receives_jsonl() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.jsonl");
        let mut policies = PolicySet::default();
        policies.audit_log_path = Some(log_path.clone());

        let handler = DlpHandler::builder(policies).build().unwrap();
        hook(&handler, &user_text(EMAIL_TEXT));
        hook(&handler, &user_text(CARD_TEXT));

        let content = std::fs::read_to_string(&log_path).unwrap();
        let events: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["action"], "mask");
        assert_eq!(events[0]["user_id"], "alice");
        assert_eq!(events[1]["action"], "block");
        assert_eq!(events[1]["categories"][0], "credit_card");
        assert!(events[1]["timestamp"].is_string());
    }
}

#[test]
fn test_handler_is_shared_across_threads() {
    let (handler, sink) = handler(Mode::Enforce);
    let handler = Arc::new(handler);

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                let text = if i % 2 == 0 { CARD_TEXT } else { EMAIL_TEXT };
                handler.pre_call_hook("u", "m", &user_text(text), RequestMetadata::default())
            })
        })
        .collect();

    let blocked = workers
        .into_iter()
        .map(|w| w.join().unwrap())
        .filter(|o| o.is_blocked())
        .count();
    assert_eq!(blocked, 4);
    assert_eq!(sink.len(), 8);
}
