//! North American phone number recognition.
//!
//! Supports the common NANP renderings:
//! - (555) 234-5678
//! - 555-234-5678
//! - 555.234.5678
//! - +1 555 234 5678

use super::patterns::Recognizer;
use once_cell::sync::Lazy;
use regex::Regex;

/// NANP phone number recognizer for the `phone` category.
#[derive(Debug, Clone, Default)]
pub struct PhoneRecognizer;

impl PhoneRecognizer {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?:\+?1[-.\s]?)?\(?\b([2-9]\d{2})\)?[-.\s]?\s*([2-9]\d{2})[-.\s]?(\d{4})\b",
            )
            .expect("Valid phone number regex")
        });
        &PATTERN
    }

    /// Validates that the parts follow NANP rules.
    ///
    /// # Rules
    /// - Area code: first digit 2-9
    /// - Exchange code: first digit 2-9
    /// - Subscriber number: any 4 digits
    pub fn validate(area: &str, exchange: &str, subscriber: &str) -> bool {
        area.len() == 3
            && exchange.len() == 3
            && subscriber.len() == 4
            && area
                .chars()
                .next()
                .is_some_and(|c| ('2'..='9').contains(&c))
            && exchange
                .chars()
                .next()
                .is_some_and(|c| ('2'..='9').contains(&c))
    }

    /// Reduces a phone number to its ten digits, if it is a valid NANP number.
    pub fn normalize(&self, text: &str) -> Option<String> {
        Self::regex().captures(text).and_then(|caps| {
            let area = caps.get(1)?.as_str();
            let exchange = caps.get(2)?.as_str();
            let subscriber = caps.get(3)?.as_str();

            Self::validate(area, exchange, subscriber)
                .then(|| format!("{}{}{}", area, exchange, subscriber))
        })
    }
}

impl Recognizer for PhoneRecognizer {
    fn category(&self) -> &str {
        "phone"
    }

    fn pattern(&self) -> &Regex {
        Self::regex()
    }

    fn is_valid(&self, candidate: &str) -> bool {
        self.normalize(candidate).is_some()
    }
}
