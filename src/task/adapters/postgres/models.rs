//! Diesel row models for task persistence.

use super::schema::tasks;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query and insert row for task records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owning organisation.
    pub organization_id: uuid::Uuid,
    /// Producing role.
    pub source_role: String,
    /// Consuming role.
    pub target_role: String,
    /// Task kind.
    pub kind: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Input payload.
    pub input: Value,
    /// Output payload.
    pub output: Option<Value>,
    /// Failure message.
    pub error: Option<String>,
    /// Lifecycle status.
    pub status: String,
    /// Priority.
    pub priority: i32,
    /// Linked deal.
    pub deal_id: Option<uuid::Uuid>,
    /// Linked lead.
    pub lead_id: Option<uuid::Uuid>,
    /// Flushed log entries.
    pub logs: Value,
    /// Attempt number.
    pub attempt: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Processing start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Termination timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle columns written by task updates.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskLifecycleChangeset {
    /// Lifecycle status.
    pub status: String,
    /// Output payload.
    pub output: Option<Value>,
    /// Failure message.
    pub error: Option<String>,
    /// Flushed log entries.
    pub logs: Value,
    /// Processing start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Termination timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
