//! Domain model for the task queue.
//!
//! Tasks are persisted units of cross-stage work with exactly one producer
//! and one terminating consumer. Log entries accumulate in memory while a
//! task runs and are flushed onto the task when it terminates.

mod error;
mod ids;
mod log;
mod task;

pub use error::{ParseAgentRoleError, ParseTaskKindError, ParseTaskStatusError, TaskDomainError};
pub use ids::{AgentRole, TaskId};
pub use log::{TaskLogEntry, TaskLogKind};
pub use task::{PersistedTaskData, Task, TaskKind, TaskSpec, TaskStatus};
