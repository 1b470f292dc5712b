//! MNPI (Material Non-Public Information) screening policy
//!
//! Blocks discussion of restricted securities and phrases that indicate
//! material non-public information. The heuristics here are intentionally
//! simple; the policy is a black box behind `PolicyModule` and deployments
//! supply their own watchlists.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use regex::Regex;
use warden_core::{PolicyContext, PolicyResult, Result};

use crate::module::PolicyModule;

pub const POLICY_NAME: &str = "mnpi_guard";

/// Ticker-shaped words that are ordinary English; never treated as symbols
const COMMON_WORDS: &[&str] = &[
    "AN", "AS", "AT", "BE", "BY", "DO", "GO", "HE", "IF", "IN", "IS", "IT", "ME", "MY", "NO",
    "OF", "ON", "OR", "SO", "TO", "UP", "US", "WE", "THE", "AND", "FOR", "ARE", "BUT", "NOT",
    "YOU", "ALL", "CAN", "HER", "WAS", "ONE", "OUR", "OUT", "DAY", "GET", "HAS", "HIM", "HIS",
    "HOW", "ITS", "MAY", "NEW", "NOW", "OLD", "SEE", "TWO", "WAY", "WHO", "DID", "LET", "PUT",
    "SAY", "SHE", "TOO", "USE",
];

/// Phrases that indicate the conversation concerns non-public material facts
const MNPI_PHRASES: &[&str] = &[
    "insider information",
    "material non-public",
    "non-public information",
    "confidential deal",
    "upcoming merger",
    "upcoming acquisition",
    "earnings before announcement",
    "pre-announcement",
    "material information",
    "restricted list",
    "trading restriction",
];

#[derive(Debug, Default)]
struct MnpiRules {
    restricted_securities: BTreeSet<String>,
}

/// Policy that screens for restricted securities and MNPI phrasing
pub struct MnpiGuardPolicy {
    ticker: Regex,
    rules: RwLock<MnpiRules>,
}

impl MnpiGuardPolicy {
    pub fn new() -> Self {
        Self {
            ticker: Regex::new(r"\$?\b[A-Z]{2,5}\b").expect("static ticker pattern"),
            rules: RwLock::new(MnpiRules::default()),
        }
    }

    /// Ticker-like tokens in `text`: 2-5 upper-case letters, optionally
    /// `$`-prefixed, excluding common English words.
    fn detect_tickers(&self, text: &str) -> BTreeSet<String> {
        let upper = text.to_uppercase();
        self.ticker
            .find_iter(&upper)
            .map(|m| m.as_str().trim_start_matches('$').to_string())
            .filter(|ticker| !COMMON_WORDS.contains(&ticker.as_str()))
            .collect()
    }

    fn detect_mnpi_phrase(&self, text: &str) -> Option<&'static str> {
        let lower = text.to_lowercase();
        MNPI_PHRASES.iter().copied().find(|phrase| lower.contains(phrase))
    }
}

impl Default for MnpiGuardPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyModule for MnpiGuardPolicy {
    fn name(&self) -> &str {
        POLICY_NAME
    }

    fn configure(&self, options: &serde_json::Value) -> Result<()> {
        let mut rules = MnpiRules::default();

        if let Some(securities) = options.get("securities").and_then(|v| v.as_array()) {
            rules.restricted_securities.extend(
                securities
                    .iter()
                    .filter_map(|s| s.as_str())
                    .map(|s| s.to_uppercase()),
            );
        }

        // One symbol per line; blank lines and '#' comments are skipped
        if let Some(path) = options.get("watch_list").and_then(|v| v.as_str()) {
            let content = std::fs::read_to_string(path)?;
            rules.restricted_securities.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_uppercase),
            );
        }

        *self.rules.write() = rules;
        Ok(())
    }

    fn evaluate(&self, ctx: &PolicyContext) -> Result<PolicyResult> {
        let mut text = ctx.prompt.clone();
        if let Some(response) = &ctx.response {
            text.push(' ');
            text.push_str(response);
        }

        let tickers = self.detect_tickers(&text);
        let restricted: Vec<String> = {
            let rules = self.rules.read();
            tickers
                .iter()
                .filter(|ticker| rules.restricted_securities.contains(*ticker))
                .cloned()
                .collect()
        };

        if !restricted.is_empty() {
            return Ok(PolicyResult::block(
                POLICY_NAME,
                format!(
                    "Restricted security detected: {}. Discussion of these securities is not permitted.",
                    restricted.join(", ")
                ),
            )
            .with_confidence(0.95));
        }

        if self.detect_mnpi_phrase(&text).is_some() {
            return Ok(PolicyResult::block(
                POLICY_NAME,
                "Potential Material Non-Public Information detected. Discussion of \
                 confidential or non-public material information is not permitted.",
            )
            .with_confidence(0.85));
        }

        if !tickers.is_empty() {
            let tickers: Vec<String> = tickers.into_iter().collect();
            return Ok(PolicyResult::allow(
                POLICY_NAME,
                format!(
                    "Ticker symbols detected ({}) but not on restricted list",
                    tickers.join(", ")
                ),
            )
            .with_confidence(0.7));
        }

        Ok(PolicyResult::allow(POLICY_NAME, "No MNPI violations detected").with_confidence(1.0))
    }
}
