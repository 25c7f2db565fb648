//! Privacy classification of outgoing text

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Whether a request may leave the local network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityHint {
    #[default]
    Normal,
    Sensitive,
}

impl SensitivityHint {
    pub fn is_sensitive(&self) -> bool {
        matches!(self, Self::Sensitive)
    }

    /// Raises the hint to `Sensitive` when `force` is set, never lowers it
    pub fn escalate(self, force: bool) -> Self {
        if force {
            Self::Sensitive
        } else {
            self
        }
    }
}

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+213|00213|\b0)\s*[5-7](?:[\s.\-]?\d){8}\b").unwrap()
});

/// Account numbers (CCP, RIB) and national identifiers are long digit runs
static DIGIT_RUN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{10,}").unwrap());

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap());

static FINANCIAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:ccp|rip|rib|iban|cle)\s*[:#n°]?\s*\d").unwrap());

/// Regex-based detector for personal and financial data
#[derive(Debug, Clone, Copy, Default)]
pub struct SensitiveDataClassifier;

impl SensitiveDataClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> SensitivityHint {
        if self.detected_kinds(text).is_empty() {
            SensitivityHint::Normal
        } else {
            SensitivityHint::Sensitive
        }
    }

    /// Names of the data kinds found, for logging without the data itself
    pub fn detected_kinds(&self, text: &str) -> Vec<&'static str> {
        let mut kinds = Vec::new();

        if PHONE_PATTERN.is_match(text) {
            kinds.push("phone");
        }
        if DIGIT_RUN_PATTERN.is_match(text) {
            kinds.push("account_number");
        }
        if EMAIL_PATTERN.is_match(text) {
            kinds.push("email");
        }
        if FINANCIAL_PATTERN.is_match(text) {
            kinds.push("financial_reference");
        }

        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_normal() {
        let classifier = SensitiveDataClassifier::new();
        assert_eq!(
            classifier.classify("automate payment tracking for my shop"),
            SensitivityHint::Normal
        );
        assert_eq!(classifier.classify("wilaya 16, max 50 results"), SensitivityHint::Normal);
    }

    #[test]
    fn test_phone_numbers_are_sensitive() {
        let classifier = SensitiveDataClassifier::new();
        assert!(classifier.classify("call me on 0550 12 34 56").is_sensitive());
        assert!(classifier.classify("+213661234567").is_sensitive());
    }

    #[test]
    fn test_account_numbers_are_sensitive() {
        let classifier = SensitiveDataClassifier::new();
        assert_eq!(
            classifier.detected_kinds("my account is 0079999901234567"),
            vec!["account_number"]
        );
        assert!(classifier.classify("CCP: 1234567 cle 89").is_sensitive());
    }

    #[test]
    fn test_email_is_sensitive() {
        let classifier = SensitiveDataClassifier::new();
        assert_eq!(classifier.detected_kinds("write to amine@example.dz"), vec!["email"]);
    }

    #[test]
    fn test_escalate_never_lowers() {
        assert_eq!(SensitivityHint::Normal.escalate(true), SensitivityHint::Sensitive);
        assert_eq!(SensitivityHint::Sensitive.escalate(false), SensitivityHint::Sensitive);
        assert_eq!(SensitivityHint::Normal.escalate(false), SensitivityHint::Normal);
    }
}
