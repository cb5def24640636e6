//! Identifier and role types for the task domain.

use super::ParseAgentRoleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new random task identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a task identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Uuid> for TaskId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline stage acting as producer or consumer of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Drives deals through the pipeline.
    Orchestrator,
    /// Gathers lead profile information.
    Enrichment,
    /// Writes and sends outbound mail.
    Outreach,
    /// Classifies replies and drafts responses.
    Negotiation,
    /// Prices offers.
    Pricing,
    /// Issues invoices and accounting documents.
    Accounting,
    /// Sends internal notifications.
    Notification,
    /// Produces scheduled research content.
    Research,
}

impl AgentRole {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orchestrator => "orchestrator",
            Self::Enrichment => "enrichment",
            Self::Outreach => "outreach",
            Self::Negotiation => "negotiation",
            Self::Pricing => "pricing",
            Self::Accounting => "accounting",
            Self::Notification => "notification",
            Self::Research => "research",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AgentRole {
    type Error = ParseAgentRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "orchestrator" => Ok(Self::Orchestrator),
            "enrichment" => Ok(Self::Enrichment),
            "outreach" => Ok(Self::Outreach),
            "negotiation" => Ok(Self::Negotiation),
            "pricing" => Ok(Self::Pricing),
            "accounting" => Ok(Self::Accounting),
            "notification" => Ok(Self::Notification),
            "research" => Ok(Self::Research),
            _ => Err(ParseAgentRoleError(value.to_owned())),
        }
    }
}
