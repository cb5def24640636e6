//! Task aggregate root and related lifecycle types.

use super::{
    AgentRole, ParseTaskKindError, ParseTaskStatusError, TaskDomainError, TaskId, TaskLogEntry,
};
use crate::deal::domain::{DealId, LeadId, OrganizationId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Task lifecycle status.
///
/// Tasks move `pending -> processing -> completed | failed`; terminal
/// statuses are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created and waiting for its consumer.
    Pending,
    /// Claimed by its consumer.
    Processing,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns whether the status is final.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns whether `self -> target` is a permitted transition.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed | Self::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Draft and send the first outreach message.
    SendOutreach,
    /// Classify and answer an inbound reply.
    NegotiateReply,
    /// Tell a reviewer an offer awaits approval.
    NotifyOfferApproval,
    /// Send an approved offer.
    SendOffer,
    /// Issue the invoice for a won deal.
    IssueInvoice,
    /// Send a follow-up on a stale deal.
    SendFollowUp,
    /// Send the post-sale satisfaction check.
    SendSatisfactionCheck,
    /// Produce scheduled research content.
    ResearchContent,
    /// Restart a lost deal with a fresh lead.
    ReopenDeal,
}

impl TaskKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SendOutreach => "send_outreach",
            Self::NegotiateReply => "negotiate_reply",
            Self::NotifyOfferApproval => "notify_offer_approval",
            Self::SendOffer => "send_offer",
            Self::IssueInvoice => "issue_invoice",
            Self::SendFollowUp => "send_follow_up",
            Self::SendSatisfactionCheck => "send_satisfaction_check",
            Self::ResearchContent => "research_content",
            Self::ReopenDeal => "reopen_deal",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskKind {
    type Error = ParseTaskKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "send_outreach" => Ok(Self::SendOutreach),
            "negotiate_reply" => Ok(Self::NegotiateReply),
            "notify_offer_approval" => Ok(Self::NotifyOfferApproval),
            "send_offer" => Ok(Self::SendOffer),
            "issue_invoice" => Ok(Self::IssueInvoice),
            "send_follow_up" => Ok(Self::SendFollowUp),
            "send_satisfaction_check" => Ok(Self::SendSatisfactionCheck),
            "research_content" => Ok(Self::ResearchContent),
            "reopen_deal" => Ok(Self::ReopenDeal),
            _ => Err(ParseTaskKindError(value.to_owned())),
        }
    }
}

/// Request payload describing a task to create.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    organization_id: OrganizationId,
    source_role: AgentRole,
    target_role: AgentRole,
    kind: TaskKind,
    title: String,
    description: Option<String>,
    input: Value,
    priority: i32,
    deal_id: Option<DealId>,
    lead_id: Option<LeadId>,
    attempt: u32,
}

impl TaskSpec {
    /// Creates a spec with the required fields, priority 0 and attempt 1.
    #[must_use]
    pub fn new(
        organization_id: OrganizationId,
        source_role: AgentRole,
        target_role: AgentRole,
        kind: TaskKind,
        title: impl Into<String>,
    ) -> Self {
        Self {
            organization_id,
            source_role,
            target_role,
            kind,
            title: title.into(),
            description: None,
            input: Value::Null,
            priority: 0,
            deal_id: None,
            lead_id: None,
            attempt: 1,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the opaque input payload.
    #[must_use]
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    /// Sets the priority; higher runs first.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Links the task to a deal.
    #[must_use]
    pub const fn with_deal(mut self, deal_id: DealId) -> Self {
        self.deal_id = Some(deal_id);
        self
    }

    /// Links the task to a lead.
    #[must_use]
    pub const fn with_lead(mut self, lead_id: LeadId) -> Self {
        self.lead_id = Some(lead_id);
        self
    }

    /// Sets the attempt number (1 for first runs).
    #[must_use]
    pub const fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    /// Returns the target role.
    #[must_use]
    pub const fn target_role(&self) -> AgentRole {
        self.target_role
    }

    /// Returns the task kind.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    organization_id: OrganizationId,
    source_role: AgentRole,
    target_role: AgentRole,
    kind: TaskKind,
    title: String,
    description: Option<String>,
    input: Value,
    output: Option<Value>,
    error: Option<String>,
    status: TaskStatus,
    priority: i32,
    deal_id: Option<DealId>,
    lead_id: Option<LeadId>,
    logs: Vec<TaskLogEntry>,
    attempt: u32,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Owning organisation.
    pub organization_id: OrganizationId,
    /// Producing role.
    pub source_role: AgentRole,
    /// Consuming role.
    pub target_role: AgentRole,
    /// Task kind.
    pub kind: TaskKind,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Input payload.
    pub input: Value,
    /// Output payload, set on completion.
    pub output: Option<Value>,
    /// Error message, set on failure.
    pub error: Option<String>,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: i32,
    /// Linked deal.
    pub deal_id: Option<DealId>,
    /// Linked lead.
    pub lead_id: Option<LeadId>,
    /// Flushed log entries.
    pub logs: Vec<TaskLogEntry>,
    /// Attempt number.
    pub attempt: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When processing started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task terminated.
    pub completed_at: Option<DateTime<Utc>>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a pending task from a spec.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] when the title is blank.
    pub fn new(spec: TaskSpec, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        let title = spec.title.trim().to_owned();
        if title.is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            organization_id: spec.organization_id,
            source_role: spec.source_role,
            target_role: spec.target_role,
            kind: spec.kind,
            title,
            description: spec.description,
            input: spec.input,
            output: None,
            error: None,
            status: TaskStatus::Pending,
            priority: spec.priority,
            deal_id: spec.deal_id,
            lead_id: spec.lead_id,
            logs: Vec::new(),
            attempt: spec.attempt.max(1),
            created_at: timestamp,
            started_at: None,
            completed_at: None,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            organization_id: data.organization_id,
            source_role: data.source_role,
            target_role: data.target_role,
            kind: data.kind,
            title: data.title,
            description: data.description,
            input: data.input,
            output: data.output,
            error: data.error,
            status: data.status,
            priority: data.priority,
            deal_id: data.deal_id,
            lead_id: data.lead_id,
            logs: data.logs,
            attempt: data.attempt,
            created_at: data.created_at,
            started_at: data.started_at,
            completed_at: data.completed_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the [`TaskSpec`] for a fresh attempt of this task.
    #[must_use]
    pub fn retry_spec(&self) -> TaskSpec {
        TaskSpec {
            organization_id: self.organization_id,
            source_role: self.source_role,
            target_role: self.target_role,
            kind: self.kind,
            title: self.title.clone(),
            description: self.description.clone(),
            input: self.input.clone(),
            priority: self.priority,
            deal_id: self.deal_id,
            lead_id: self.lead_id,
            attempt: self.attempt.saturating_add(1),
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning organisation.
    #[must_use]
    pub const fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    /// Returns the producing role.
    #[must_use]
    pub const fn source_role(&self) -> AgentRole {
        self.source_role
    }

    /// Returns the consuming role.
    #[must_use]
    pub const fn target_role(&self) -> AgentRole {
        self.target_role
    }

    /// Returns the task kind.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the input payload.
    #[must_use]
    pub const fn input(&self) -> &Value {
        &self.input
    }

    /// Returns the output payload, set on completion.
    #[must_use]
    pub const fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    /// Returns the error message, set on failure.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the linked deal.
    #[must_use]
    pub const fn deal_id(&self) -> Option<DealId> {
        self.deal_id
    }

    /// Returns the linked lead.
    #[must_use]
    pub const fn lead_id(&self) -> Option<LeadId> {
        self.lead_id
    }

    /// Returns the flushed log entries.
    #[must_use]
    pub fn logs(&self) -> &[TaskLogEntry] {
        &self.logs
    }

    /// Returns the attempt number.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when processing started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the task terminated.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns when the task entered its current status.
    #[must_use]
    pub fn status_since(&self) -> DateTime<Utc> {
        match self.status {
            TaskStatus::Pending => self.created_at,
            TaskStatus::Processing => self.started_at.unwrap_or(self.updated_at),
            TaskStatus::Completed | TaskStatus::Failed => {
                self.completed_at.unwrap_or(self.updated_at)
            }
        }
    }

    /// Claims the task for processing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] unless the task
    /// is pending.
    pub fn start_processing(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.transition_to(TaskStatus::Processing)?;
        let timestamp = clock.utc();
        self.started_at = Some(timestamp);
        self.updated_at = timestamp;
        Ok(())
    }

    /// Completes the task with `output`, appending the drained `logs`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] unless the task
    /// is processing.
    pub fn complete(
        &mut self,
        output: Value,
        logs: Vec<TaskLogEntry>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.transition_to(TaskStatus::Completed)?;
        self.output = Some(output);
        self.terminate(logs, clock);
        Ok(())
    }

    /// Fails the task with `error`, appending the drained `logs`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] unless the task
    /// is processing.
    pub fn fail(
        &mut self,
        error: impl Into<String>,
        logs: Vec<TaskLogEntry>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.transition_to(TaskStatus::Failed)?;
        self.error = Some(error.into());
        self.terminate(logs, clock);
        Ok(())
    }

    const fn transition_to(&mut self, target: TaskStatus) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(TaskDomainError::InvalidStatusTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }

    fn terminate(&mut self, logs: Vec<TaskLogEntry>, clock: &impl Clock) {
        let timestamp = clock.utc();
        self.logs.extend(logs);
        self.completed_at = Some(timestamp);
        self.updated_at = timestamp;
    }
}
