//! Position-safe text redaction.
//!
//! Every match span is replaced with `[REDACTED_<CATEGORY>]`. Replacements
//! are applied from the highest start offset down, so a replacement never
//! shifts the offsets of spans still waiting to be applied.
//!
//! Spans must be non-overlapping for that to hold. Detectors are expected
//! to deliver non-overlapping spans, but this is checked here: among
//! overlapping spans the longest is kept (earliest start on ties) and the
//! rest are dropped with a warning. Spans that fall outside the text, split
//! a UTF-8 character, or do not cover their recorded text are skipped.

use crate::domain::{DetectionMap, Match};
use serde::Serialize;
use std::collections::BTreeMap;

/// Redacted text plus the original values that were removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RedactionOutcome {
    pub redacted_text: String,
    /// Original matched values per category, captured before any mutation.
    pub redacted_items: BTreeMap<String, Vec<String>>,
}

impl RedactionOutcome {
    /// Returns true if any category contributed items.
    pub fn has_redactions(&self) -> bool {
        !self.redacted_items.is_empty()
    }
}

/// Placeholder written in place of a `category` match.
pub fn placeholder(category: &str) -> String {
    format!("[REDACTED_{}]", category.to_uppercase())
}

/// Redacts every match in `detections` from `text`.
pub fn redact(text: &str, detections: &DetectionMap) -> RedactionOutcome {
    let mut redacted_items = BTreeMap::new();
    let mut spans: Vec<(&str, &Match)> = Vec::new();

    for (category, matches) in detections.iter() {
        if matches.is_empty() {
            continue;
        }
        redacted_items.insert(
            category.to_string(),
            matches.iter().map(|m| m.text.clone()).collect(),
        );
        spans.extend(
            matches
                .iter()
                .filter(|m| is_applicable(text, category, m))
                .map(|m| (category, m)),
        );
    }

    let mut spans = resolve_overlaps(spans);
    spans.sort_by(|a, b| b.1.start.cmp(&a.1.start));

    let mut redacted_text = text.to_string();
    for (category, found) in spans {
        redacted_text.replace_range(found.start..found.end, &placeholder(category));
    }

    RedactionOutcome {
        redacted_text,
        redacted_items,
    }
}

fn is_applicable(text: &str, category: &str, found: &Match) -> bool {
    if found.is_empty() {
        return false;
    }
    match text.get(found.start..found.end) {
        None => {
            log::warn!(
                "[REDACT] Skipping {} match at {}..{}: outside text of {} bytes or not on a character boundary",
                category,
                found.start,
                found.end,
                text.len()
            );
            false
        }
        Some(covered) if covered != found.text => {
            // Matches from other coordinate spaces (images, pages) land here.
            log::debug!(
                "[REDACT] Skipping {} match at {}..{}: span does not cover its recorded text",
                category,
                found.start,
                found.end
            );
            false
        }
        Some(_) => true,
    }
}

/// Drops overlapping spans, keeping the longest of each overlapping group.
///
/// Ties are broken by the earlier start. The returned spans are pairwise
/// non-overlapping and in no particular order.
pub fn resolve_overlaps<'a, T>(mut spans: Vec<(T, &'a Match)>) -> Vec<(T, &'a Match)>
where
    T: Copy + std::fmt::Display,
{
    spans.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.1.start.cmp(&b.1.start)));

    // kept non-empty spans by start; being disjoint, they are also ordered by end
    let mut index: BTreeMap<usize, (usize, T)> = BTreeMap::new();
    let mut kept: Vec<(T, &'a Match)> = Vec::with_capacity(spans.len());
    for (category, found) in spans {
        if found.is_empty() {
            kept.push((category, found));
            continue;
        }
        let winner = index
            .range(..found.end)
            .next_back()
            .filter(|(_, (end, _))| *end > found.start)
            .map(|(_, (_, winner))| *winner);
        if let Some(winner) = winner {
            log::warn!(
                "[REDACT] Dropping {} match at {}..{}: overlaps a longer {} match",
                category,
                found.start,
                found.end,
                winner
            );
            continue;
        }
        index.insert(found.start, (found.end, category));
        kept.push((category, found));
    }
    kept
}
