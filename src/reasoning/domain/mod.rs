//! Prompt types for the reasoning service.

use serde::{Deserialize, Serialize};
use std::fmt;

const STRICT_INSTRUCTION: &str = "Respond with exactly one JSON object that matches the \
requested schema. Do not add prose, markdown or code fences.";

/// Pipeline step a prompt serves; each step has one response schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStep {
    /// First message to a lead: `{subject, body}`.
    Outreach,
    /// Reply classification and drafting: a negotiation decision.
    Negotiation,
    /// Scheduled market and content research.
    Research,
}

impl ReasoningStep {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Outreach => "outreach",
            Self::Negotiation => "negotiation",
            Self::Research => "research",
        }
    }
}

impl fmt::Display for ReasoningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured prompt sent to the reasoning service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningPrompt {
    step: ReasoningStep,
    system: String,
    user: String,
    strict: bool,
}

impl ReasoningPrompt {
    /// Creates a prompt for `step`.
    #[must_use]
    pub fn new(step: ReasoningStep, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            step,
            system: system.into(),
            user: user.into(),
            strict: false,
        }
    }

    /// Returns the same prompt with the strict-output instruction appended.
    #[must_use]
    pub fn into_strict(self) -> Self {
        if self.strict {
            return self;
        }
        Self {
            system: format!("{}\n\n{STRICT_INSTRUCTION}", self.system),
            strict: true,
            ..self
        }
    }

    /// Returns the step.
    #[must_use]
    pub const fn step(&self) -> ReasoningStep {
        self.step
    }

    /// Returns the system instruction.
    #[must_use]
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Returns the user content.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns whether this is the strict retry.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }
}
