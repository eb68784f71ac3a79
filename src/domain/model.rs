//! Model identifier pattern matching.
//!
//! Patterns are regular expressions that must match the whole model
//! identifier. A plain identifier such as `openai/gpt-4` is itself a valid
//! pattern and matches only that model (the `.` matches itself as well).
//! Patterns that fail to compile never match.

use regex::Regex;
use std::fmt;

/// A model pattern compiled once at configuration load.
#[derive(Clone)]
pub struct ModelPattern {
    source: String,
    regex: Option<Regex>,
}

impl ModelPattern {
    /// Compiles a pattern, anchored to the full identifier.
    ///
    /// Compile failures are logged and produce a pattern that never matches.
    pub fn new(pattern: &str) -> Self {
        // the raw pattern must compile on its own; wrapping can balance a stray ')'
        let regex = match Regex::new(pattern).and_then(|_| Regex::new(&anchored(pattern))) {
            Ok(regex) => Some(regex),
            Err(e) => {
                log::warn!(
                    "[POLICY] Invalid model pattern '{}', it will never match: {}",
                    pattern,
                    e
                );
                None
            }
        };
        Self {
            source: pattern.to_string(),
            regex,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// False when the pattern failed to compile.
    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    pub fn matches(&self, model_id: &str) -> bool {
        self.regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(model_id))
    }
}

impl fmt::Debug for ModelPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelPattern")
            .field("source", &self.source)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl PartialEq for ModelPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl From<&str> for ModelPattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

/// Checks a model identifier against a single uncompiled pattern.
pub fn matches_model(model_id: &str, pattern: &str) -> bool {
    ModelPattern::new(pattern).matches(model_id)
}

fn anchored(pattern: &str) -> String {
    format!("^(?:{})$", pattern)
}
