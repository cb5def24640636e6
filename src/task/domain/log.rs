//! Task log entries.

use super::AgentRole;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category of a task log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskLogKind {
    /// Progress information.
    Info,
    /// A decision taken by the consumer.
    Decision,
    /// An external side effect (mail sent, invoice issued).
    Action,
    /// Something unexpected that did not stop the task.
    Warning,
    /// A failure.
    Error,
}

/// A single log line accumulated while a task runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLogEntry {
    kind: TaskLogKind,
    source_role: AgentRole,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<Value>,
    logged_at: DateTime<Utc>,
}

impl TaskLogEntry {
    /// Creates an entry stamped with the current clock time.
    #[must_use]
    pub fn new(
        kind: TaskLogKind,
        source_role: AgentRole,
        message: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            kind,
            source_role,
            message: message.into(),
            detail: None,
            logged_at: clock.utc(),
        }
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Returns the entry category.
    #[must_use]
    pub const fn kind(&self) -> TaskLogKind {
        self.kind
    }

    /// Returns the role that wrote the entry.
    #[must_use]
    pub const fn source_role(&self) -> AgentRole {
        self.source_role
    }

    /// Returns the message text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the structured detail, if any.
    #[must_use]
    pub const fn detail(&self) -> Option<&Value> {
        self.detail.as_ref()
    }

    /// Returns when the entry was written.
    #[must_use]
    pub const fn logged_at(&self) -> DateTime<Utc> {
        self.logged_at
    }
}
