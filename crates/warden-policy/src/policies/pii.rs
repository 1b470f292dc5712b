//! PII detection and redaction policy
//!
//! Detects personally identifiable information in the checkpoint's subject
//! text and rewrites each occurrence to a reversible placeholder token of
//! the form `[REDACTED:<TYPE>:ref_NNNN]`. The token counter restarts on
//! every evaluation, so results are deterministic for a given input.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use regex::Regex;
use serde::Deserialize;
use warden_core::{PolicyContext, PolicyResult, Result};

use crate::module::PolicyModule;

pub const POLICY_NAME: &str = "pii_redaction";

/// Which PII categories to detect and redact
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct PiiSettings {
    redact_emails: bool,
    redact_phones: bool,
    redact_ssn: bool,
    redact_credit_cards: bool,
    redact_bank_accounts: bool,
}

impl Default for PiiSettings {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_ssn: true,
            redact_credit_cards: true,
            redact_bank_accounts: true,
        }
    }
}

/// Policy that detects and redacts emails, phone numbers, SSNs, credit card
/// numbers, and contextual bank account numbers.
pub struct PiiRedactionPolicy {
    email: Regex,
    phone_us: Regex,
    phone_intl: Regex,
    ssn: Regex,
    credit_card: Regex,
    bank_account: Regex,
    settings: RwLock<PiiSettings>,
}

impl PiiRedactionPolicy {
    pub fn new() -> Self {
        Self {
            email: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
                .expect("static email pattern"),
            phone_us: Regex::new(r"\+?1?[-.\s]?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}")
                .expect("static phone pattern"),
            phone_intl: Regex::new(r"\+\d{1,3}[-.\s]?\d{1,4}[-.\s]?\d{1,4}[-.\s]?\d{1,9}")
                .expect("static phone pattern"),
            ssn: Regex::new(r"\b\d{3}[-.\s]\d{2}[-.\s]\d{4}\b").expect("static ssn pattern"),
            credit_card: Regex::new(r"\b\d{4}[-.\s]?\d{4}[-.\s]?\d{4}[-.\s]?\d{4}\b")
                .expect("static card pattern"),
            bank_account: Regex::new(
                r"(?i)\b(?:account|routing|acct)(?:\s+number)?\s*:?\s*(\d{8,17})\b",
            )
            .expect("static account pattern"),
            settings: RwLock::new(PiiSettings::default()),
        }
    }

    /// Detect and redact all enabled PII categories in `text`.
    ///
    /// Returns the rewritten text and the placeholder-to-original mapping;
    /// an empty mapping means nothing was found.
    fn redact(&self, text: &str) -> (String, BTreeMap<String, String>) {
        let settings = self.settings.read().clone();
        let mut detections: Vec<(String, String)> = Vec::new();
        let mut counter = 0usize;

        let mut push = |detections: &mut Vec<(String, String)>, kind: &str, original: String| {
            if detections.iter().any(|(existing, _)| *existing == original) {
                return;
            }
            counter += 1;
            detections.push((original, format!("[REDACTED:{kind}:ref_{counter:04}]")));
        };

        if settings.redact_emails {
            for m in self.email.find_iter(text) {
                push(&mut detections, "EMAIL", m.as_str().to_string());
            }
        }

        if settings.redact_phones {
            for m in self.phone_us.find_iter(text) {
                push(&mut detections, "PHONE", m.as_str().to_string());
            }
            for m in self.phone_intl.find_iter(text) {
                push(&mut detections, "PHONE", m.as_str().to_string());
            }
        }

        if settings.redact_ssn {
            for m in self.ssn.find_iter(text) {
                push(&mut detections, "SSN", m.as_str().to_string());
            }
        }

        if settings.redact_credit_cards {
            for m in self.credit_card.find_iter(text) {
                push(&mut detections, "CREDIT_CARD", m.as_str().to_string());
            }
        }

        if settings.redact_bank_accounts {
            for caps in self.bank_account.captures_iter(text) {
                if let Some(number) = caps.get(1) {
                    push(&mut detections, "BANK_ACCOUNT", number.as_str().to_string());
                }
            }
        }

        let mut redacted = text.to_string();
        let mut tokens = BTreeMap::new();
        for (original, token) in detections {
            redacted = redacted.replace(&original, &token);
            tokens.insert(token, original);
        }

        (redacted, tokens)
    }
}

impl Default for PiiRedactionPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyModule for PiiRedactionPolicy {
    fn name(&self) -> &str {
        POLICY_NAME
    }

    fn configure(&self, options: &serde_json::Value) -> Result<()> {
        *self.settings.write() = serde_json::from_value(options.clone())?;
        Ok(())
    }

    fn evaluate(&self, ctx: &PolicyContext) -> Result<PolicyResult> {
        let (redacted, tokens) = self.redact(ctx.subject_text());

        if tokens.is_empty() {
            return Ok(PolicyResult::allow(POLICY_NAME, "No PII detected").with_confidence(1.0));
        }

        Ok(PolicyResult::redact(
            POLICY_NAME,
            format!("PII detected and redacted: {} item(s) found", tokens.len()),
            redacted,
        )
        .with_confidence(0.9)
        .with_redaction_tokens(tokens))
    }
}
