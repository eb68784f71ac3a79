//! Shared value types for located sensitive data.
//!
//! A [`Match`] is one occurrence of a category inside some coordinate space.
//! For text the space is byte offsets into one UTF-8 blob; for document pages
//! and images the offsets are opaque and owned by the external detector.
//! A [`DetectionMap`] groups matches by category and is created fresh for
//! every request.

pub mod model;

pub use model::{matches_model, ModelPattern};

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;

/// One located occurrence of sensitive data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    /// The matched text as it appeared in the source
    pub text: String,
    /// Inclusive start offset
    pub start: usize,
    /// Exclusive end offset
    pub end: usize,
}

impl Match {
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Builds a match from a span of `source`, copying the covered text.
    ///
    /// Returns `None` when the span is out of range or splits a character.
    pub fn from_span(source: &str, start: usize, end: usize) -> Option<Self> {
        source
            .get(start..end)
            .map(|text| Self::new(text, start, end))
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the two spans share at least one byte.
    pub fn overlaps(&self, other: &Match) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if this match can be applied to `source` as a character-offset span.
    pub fn fits(&self, source: &str) -> bool {
        self.start <= self.end && source.get(self.start..self.end).is_some()
    }
}

/// Matches grouped by category name.
///
/// Categories are open string tags (`"email"`, `"credit_card"`, or any
/// custom name). Iteration is ordered by category name so decisions and
/// audit output are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionMap {
    entries: BTreeMap<String, Vec<Match>>,
}

impl DetectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends matches to a category, creating it if needed.
    ///
    /// Empty match lists do not create a category.
    pub fn extend(&mut self, category: impl Into<String>, matches: impl IntoIterator<Item = Match>) {
        let mut matches = matches.into_iter().peekable();
        if matches.peek().is_none() {
            return;
        }
        self.entries
            .entry(category.into())
            .or_default()
            .extend(matches);
    }

    pub fn push(&mut self, category: impl Into<String>, found: Match) {
        self.entries.entry(category.into()).or_default().push(found);
    }

    /// Merges another map into this one by concatenating per category.
    pub fn merge(&mut self, other: DetectionMap) {
        for (category, matches) in other.entries {
            self.extend(category, matches);
        }
    }

    /// Keeps only the named categories. `None` keeps everything.
    pub fn retain_enabled(&mut self, enabled: Option<&BTreeSet<String>>) {
        if let Some(enabled) = enabled {
            self.entries.retain(|category, _| enabled.contains(category));
        }
    }

    pub fn get(&self, category: &str) -> Option<&[Match]> {
        self.entries.get(category).map(Vec::as_slice)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.entries.contains_key(category)
    }

    /// Literal matched texts for a category, in detection order.
    pub fn matched_texts(&self, category: &str) -> Vec<String> {
        self.get(category)
            .map(|matches| matches.iter().map(|m| m.text.clone()).collect())
            .unwrap_or_default()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Match])> {
        self.entries
            .iter()
            .map(|(category, matches)| (category.as_str(), matches.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total_matches(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

impl FromIterator<(String, Vec<Match>)> for DetectionMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Match>)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (category, matches) in iter {
            map.extend(category, matches);
        }
        map
    }
}

impl IntoIterator for DetectionMap {
    type Item = (String, Vec<Match>);
    type IntoIter = btree_map::IntoIter<String, Vec<Match>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
