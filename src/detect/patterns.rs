//! Regex-based recognizers for common secrets and personal data.
//!
//! The built-in recognizers are compiled once per process and shared by
//! every [`PatternDetector`]. Overlapping hits across categories are
//! resolved before the map is returned, so downstream redaction always
//! receives non-overlapping spans.

use super::phone::PhoneRecognizer;
use super::TextDetector;
use crate::domain::{DetectionMap, Match};
use crate::error::{DlpError, DlpResult};
use crate::redaction::text::resolve_overlaps;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A single-category pattern.
pub trait Recognizer: Send + Sync {
    /// Category name reported for hits.
    fn category(&self) -> &str;

    fn pattern(&self) -> &Regex;

    /// Rejects regex hits that fail a semantic check (checksums, ranges).
    fn is_valid(&self, _candidate: &str) -> bool {
        true
    }

    fn find_all(&self, text: &str) -> Vec<Match> {
        self.pattern()
            .find_iter(text)
            .filter(|m| self.is_valid(m.as_str()))
            .map(|m| Match::new(m.as_str(), m.start(), m.end()))
            .collect()
    }
}

/// A recognizer defined by a regex and an optional validator.
#[derive(Clone)]
pub struct RegexRecognizer {
    category: String,
    regex: Regex,
    validator: Option<fn(&str) -> bool>,
}

impl RegexRecognizer {
    /// Compiles a custom recognizer.
    pub fn new(category: impl Into<String>, pattern: &str) -> DlpResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| DlpError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            category: category.into(),
            regex,
            validator: None,
        })
    }

    pub fn with_validator(mut self, validator: fn(&str) -> bool) -> Self {
        self.validator = Some(validator);
        self
    }

    fn builtin(category: &str, pattern: &str) -> Self {
        Self {
            category: category.to_string(),
            regex: Regex::new(pattern).expect("Valid built-in recognizer regex"),
            validator: None,
        }
    }
}

impl std::fmt::Debug for RegexRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexRecognizer")
            .field("category", &self.category)
            .field("pattern", &self.regex.as_str())
            .field("validated", &self.validator.is_some())
            .finish()
    }
}

impl Recognizer for RegexRecognizer {
    fn category(&self) -> &str {
        &self.category
    }

    fn pattern(&self) -> &Regex {
        &self.regex
    }

    fn is_valid(&self, candidate: &str) -> bool {
        self.validator.map_or(true, |validate| validate(candidate))
    }
}

/// Luhn checksum over the digits of `candidate`, ignoring separators.
pub fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

fn ssn_valid(candidate: &str) -> bool {
    let parts: Vec<&str> = candidate.split('-').collect();
    match parts.as_slice() {
        [area, group, serial] => {
            *area != "000"
                && *area != "666"
                && !area.starts_with('9')
                && *group != "00"
                && *serial != "0000"
        }
        _ => false,
    }
}

static BUILTINS: Lazy<Vec<Arc<dyn Recognizer>>> = Lazy::new(|| {
    let recognizers: Vec<Arc<dyn Recognizer>> = vec![
        Arc::new(RegexRecognizer::builtin(
            "email",
            r"(?i)\b[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}\b",
        )),
        Arc::new(PhoneRecognizer::new()),
        Arc::new(
            RegexRecognizer::builtin("ssn", r"\b\d{3}-\d{2}-\d{4}\b").with_validator(ssn_valid),
        ),
        Arc::new(
            RegexRecognizer::builtin("credit_card", r"\b(?:\d[ -]?){12,18}\d\b")
                .with_validator(luhn_valid),
        ),
        Arc::new(RegexRecognizer::builtin(
            "api_key",
            r"\b(?:sk-[A-Za-z0-9_-]{20,}|AKIA[0-9A-Z]{16}|ghp_[A-Za-z0-9]{36}|xox[abprs]-[A-Za-z0-9-]{10,}|AIza[0-9A-Za-z_-]{35})",
        )),
        Arc::new(RegexRecognizer::builtin(
            "pem_key",
            r"(?s)-----BEGIN (?:[A-Z]+ )*PRIVATE KEY-----.*?-----END (?:[A-Z]+ )*PRIVATE KEY-----",
        )),
        Arc::new(RegexRecognizer::builtin(
            "jwt_token",
            r"\beyJ[A-Za-z0-9_-]+\.eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+",
        )),
        Arc::new(RegexRecognizer::builtin(
            "database_url",
            r#"\b(?:postgres(?:ql)?|mysql|mariadb|mongodb(?:\+srv)?|redis|mssql|sqlserver)://[^\s'"<>]+"#,
        )),
        Arc::new(RegexRecognizer::builtin(
            "cloud_credential",
            r"(?im)^[ \t]*(?:aws_access_key_id|aws_secret_access_key|aws_session_token|azure_client_secret|gcp_private_key_id)[ \t]*[=:][ \t]*\S+",
        )),
    ];
    recognizers
});

/// Names of the built-in categories.
pub fn builtin_categories() -> Vec<String> {
    BUILTINS.iter().map(|r| r.category().to_string()).collect()
}

/// Text detector backed by a set of regex recognizers.
#[derive(Clone)]
pub struct PatternDetector {
    recognizers: Vec<Arc<dyn Recognizer>>,
    enabled_types: Option<BTreeSet<String>>,
}

impl PatternDetector {
    /// A detector with every built-in recognizer enabled.
    pub fn new() -> Self {
        Self {
            recognizers: BUILTINS.to_vec(),
            enabled_types: None,
        }
    }

    /// Restricts detection to the named categories. `None` enables all.
    pub fn with_enabled_types(mut self, enabled: Option<BTreeSet<String>>) -> Self {
        self.enabled_types = enabled;
        self
    }

    /// Adds a recognizer, for example a custom [`RegexRecognizer`].
    pub fn with_recognizer(mut self, recognizer: impl Recognizer + 'static) -> Self {
        self.recognizers.push(Arc::new(recognizer));
        self
    }

    fn is_enabled(&self, category: &str) -> bool {
        self.enabled_types
            .as_ref()
            .map_or(true, |enabled| enabled.contains(category))
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PatternDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternDetector")
            .field(
                "recognizers",
                &self.recognizers.iter().map(|r| r.category()).collect::<Vec<_>>(),
            )
            .field("enabled_types", &self.enabled_types)
            .finish()
    }
}

impl TextDetector for PatternDetector {
    fn detect(&self, text: &str) -> DetectionMap {
        let hits: Vec<(&str, Match)> = self
            .recognizers
            .iter()
            .filter(|r| self.is_enabled(r.category()))
            .flat_map(|r| {
                r.find_all(text)
                    .into_iter()
                    .map(move |m| (r.category(), m))
            })
            .collect();

        let mut kept = resolve_overlaps(hits.iter().map(|(c, m)| (*c, m)).collect());
        kept.sort_by_key(|(_, m)| m.start);

        let mut detections = DetectionMap::new();
        for (category, found) in kept {
            detections.push(category, found.clone());
        }
        if !detections.is_empty() {
            log::debug!(
                "[DETECT] {} match(es) across {} categories",
                detections.total_matches(),
                detections.len()
            );
        }
        detections
    }
}
