//! Chat message shapes and the text/image extraction boundary.
//!
//! Messages follow the OpenAI chat format: `content` is either a plain
//! string or a list of typed parts. Everything the engine inspects is
//! flattened here into one [`TextBlob`] plus a list of decoded images, and
//! masked text is written back into the original message structure.

use crate::domain::{DetectionMap, Match};
use crate::redaction::redact;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ops::Range;

/// Separator placed between text segments in the blob.
const SEGMENT_SEPARATOR: &str = " ";

/// One chat message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    /// Any other fields (`name`, `tool_calls`, ...), passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn new(role: impl Into<String>, content: MessageContent) -> Self {
        Self {
            role: Some(role.into()),
            content: Some(content),
            extra: Map::new(),
        }
    }

    /// A user message with plain string content.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new("user", MessageContent::Text(text.into()))
    }

    /// A user message with multi-part content.
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self::new("user", MessageContent::Parts(parts))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    Image { image: String },
    /// Any other part (`input_audio`, `file`, ...), carried through as-is
    #[serde(untagged)]
    Other(Value),
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Request payload the host passes through the hook.
///
/// Only the fields the hook reads or writes are typed; everything else rides
/// along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Host call identifier, copied into audit events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Replacement messages, set when content was masked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_headers: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestMetadata {
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..Self::default()
        }
    }
}

/// Where one segment of the blob came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    /// Index of the message
    pub message: usize,
    /// Index of the part, `None` for plain string content
    pub part: Option<usize>,
    /// Byte range of the segment inside the blob
    pub range: Range<usize>,
}

/// All message text joined into one string, with the origin of each piece.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlob {
    pub text: String,
    pub segments: Vec<TextSegment>,
}

impl TextBlob {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn push(&mut self, message: usize, part: Option<usize>, text: &str) {
        if !self.text.is_empty() {
            self.text.push_str(SEGMENT_SEPARATOR);
        }
        let start = self.text.len();
        self.text.push_str(text);
        self.segments.push(TextSegment {
            message,
            part,
            range: start..self.text.len(),
        });
    }
}

/// Joins every non-empty text value across `messages`, in order.
pub fn extract_text(messages: &[Message]) -> TextBlob {
    let mut blob = TextBlob::default();
    for (msg_idx, message) in messages.iter().enumerate() {
        match &message.content {
            Some(MessageContent::Text(text)) if !text.is_empty() => {
                blob.push(msg_idx, None, text);
            }
            Some(MessageContent::Parts(parts)) => {
                for (part_idx, part) in parts.iter().enumerate() {
                    if let ContentPart::Text { text } = part {
                        if !text.is_empty() {
                            blob.push(msg_idx, Some(part_idx), text);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    blob
}

/// Decodes every inline base64 image (`data:image/...`) in `messages`.
///
/// Remote URLs are not fetched. Images that fail to decode are skipped.
pub fn extract_images(messages: &[Message]) -> Vec<Vec<u8>> {
    let mut images = Vec::new();
    for message in messages {
        let Some(MessageContent::Parts(parts)) = &message.content else {
            continue;
        };
        for part in parts {
            let data_url = match part {
                ContentPart::ImageUrl { image_url } => image_url.url.as_str(),
                ContentPart::Image { image } => image.as_str(),
                ContentPart::Text { .. } | ContentPart::Other(_) => continue,
            };
            if !data_url.starts_with("data:image") {
                continue;
            }
            match decode_data_url(data_url) {
                Some(bytes) => images.push(bytes),
                None => log::warn!("[DETECT] Failed to decode inline base64 image, skipping it"),
            }
        }
    }
    images
}

fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let (_, data) = url.split_once(',')?;
    STANDARD.decode(data.trim()).ok()
}

/// Returns `messages` with every blob match replaced by its placeholder.
///
/// `detections` must hold offsets into `blob.text`. Each match is moved into
/// the segment that contains it; a match crossing a segment boundary cannot
/// be written back and is dropped with a warning.
pub fn mask_messages(messages: &[Message], blob: &TextBlob, detections: &DetectionMap) -> Vec<Message> {
    let mut masked = messages.to_vec();

    for segment in &blob.segments {
        let local = segment_detections(segment, detections);
        if local.is_empty() {
            continue;
        }
        let Some(segment_text) = blob.text.get(segment.range.clone()) else {
            continue;
        };
        let redacted = redact(segment_text, &local).redacted_text;

        let Some(message) = masked.get_mut(segment.message) else {
            continue;
        };
        match (&mut message.content, segment.part) {
            (Some(MessageContent::Text(text)), None) => *text = redacted,
            (Some(MessageContent::Parts(parts)), Some(idx)) => {
                if let Some(ContentPart::Text { text }) = parts.get_mut(idx) {
                    *text = redacted;
                }
            }
            _ => {}
        }
    }

    for (category, matches) in detections.iter() {
        for found in matches {
            let inside_one = blob
                .segments
                .iter()
                .any(|s| s.range.start <= found.start && found.end <= s.range.end);
            let in_blob = blob.text.get(found.start..found.end) == Some(found.text.as_str());
            if in_blob && !inside_one {
                log::warn!(
                    "[REDACT] {} match at {}..{} spans two messages and was not masked",
                    category,
                    found.start,
                    found.end
                );
            }
        }
    }

    masked
}

/// The matches that fall inside `segment`, shifted to segment offsets.
fn segment_detections(segment: &TextSegment, detections: &DetectionMap) -> DetectionMap {
    let range = &segment.range;
    detections
        .iter()
        .map(|(category, matches)| {
            let local = matches
                .iter()
                .filter(|m| range.start <= m.start && m.end <= range.end)
                .map(|m| Match::new(m.text.clone(), m.start - range.start, m.end - range.start))
                .collect::<Vec<_>>();
            (category.to_string(), local)
        })
        .collect()
}
