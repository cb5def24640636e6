//! Scheduled research runs.

use crate::deal::domain::OrganizationId;
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Research run identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResearchRunId(Uuid);

impl ResearchRunId {
    /// Generates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResearchRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResearchRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchRunStatus {
    /// Started and not yet finished.
    Running,
    /// Finished with a summary.
    Completed,
    /// Finished with an error, or abandoned after timing out.
    Failed,
}

/// One research pass for an organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRun {
    id: ResearchRunId,
    organization_id: OrganizationId,
    status: ResearchRunStatus,
    summary: Option<String>,
    error: Option<String>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl ResearchRun {
    /// Starts a run now.
    #[must_use]
    pub fn start(organization_id: OrganizationId, clock: &impl Clock) -> Self {
        Self {
            id: ResearchRunId::new(),
            organization_id,
            status: ResearchRunStatus::Running,
            summary: None,
            error: None,
            started_at: clock.utc(),
            finished_at: None,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> ResearchRunId {
        self.id
    }

    /// Returns the owning organisation.
    #[must_use]
    pub const fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    /// Returns the run state.
    #[must_use]
    pub const fn status(&self) -> ResearchRunStatus {
        self.status
    }

    /// Returns the research summary of a completed run.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Returns the failure of a failed run.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns when the run started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns when the run finished.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Returns whether the run is still marked running and has not exceeded
    /// `timeout`.
    #[must_use]
    pub fn is_live(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        self.status == ResearchRunStatus::Running && now - self.started_at < timeout
    }

    /// Marks the run completed.
    pub fn complete(&mut self, summary: impl Into<String>, clock: &impl Clock) {
        self.status = ResearchRunStatus::Completed;
        self.summary = Some(summary.into());
        self.finished_at = Some(clock.utc());
    }

    /// Marks the run failed.
    pub fn fail(&mut self, error: impl Into<String>, clock: &impl Clock) {
        self.status = ResearchRunStatus::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(clock.utc());
    }
}
