//! Policy outcomes and the precedence lattice

use serde::{Deserialize, Serialize};

/// The four possible outcomes of a policy evaluation.
///
/// Precedence, most to least restrictive:
/// 1. `Block` - stops the flow immediately
/// 2. `Escalate` - requires human review
/// 3. `Redact` - modifies content but allows
/// 4. `Allow` - proceeds unchanged
///
/// Combining a set of outcomes always yields the most restrictive member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyOutcome {
    Allow,
    Redact,
    Escalate,
    Block,
}

impl PolicyOutcome {
    /// Precedence rank for outcome comparison. Lower = more restrictive.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Block => 1,
            Self::Escalate => 2,
            Self::Redact => 3,
            Self::Allow => 4,
        }
    }

    /// Resolve a set of outcomes to the most restrictive one.
    ///
    /// An empty set resolves to `Allow`.
    pub fn resolve(outcomes: impl IntoIterator<Item = PolicyOutcome>) -> PolicyOutcome {
        outcomes
            .into_iter()
            .min_by_key(|outcome| outcome.precedence())
            .unwrap_or(Self::Allow)
    }

    /// The canonical upper-case name (`"ALLOW"`, `"REDACT"`, ...)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Redact => "REDACT",
            Self::Escalate => "ESCALATE",
            Self::Block => "BLOCK",
        }
    }
}

impl std::fmt::Display for PolicyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The point in the request flow at which policies run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Checkpoint {
    /// Before the model call, on the user prompt
    Input,
    /// After the model call, on the generated response
    Output,
}

impl Checkpoint {
    /// The canonical lower-case name (`"input"` / `"output"`)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Checkpoint {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Self::Input),
            "output" => Ok(Self::Output),
            other => Err(crate::Error::config(format!(
                "unknown checkpoint '{other}', expected 'input' or 'output'"
            ))),
        }
    }
}
