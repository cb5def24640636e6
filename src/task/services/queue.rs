//! Task queue service: creation, claiming and idempotent termination.

use crate::deal::domain::{DealId, OrganizationId};
use crate::task::{
    domain::{AgentRole, Task, TaskDomainError, TaskId, TaskLogEntry, TaskSpec, TaskStatus},
    ports::{TaskRepository, TaskRepositoryError},
    services::TaskLogBuffer,
};
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Service-level errors for task queue operations.
#[derive(Debug, Error)]
pub enum TaskQueueError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
}

/// Result type for task queue operations.
pub type TaskQueueResult<T> = Result<T, TaskQueueError>;

/// How a termination request was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The task moved to the requested terminal status.
    Applied,
    /// The task was already terminal; nothing was written.
    AlreadyTerminal(TaskStatus),
}

/// Task queue orchestration service.
///
/// Owns the log buffer lifecycle: buffers open on creation and are drained
/// exactly once, when the task terminates.
pub struct TaskQueueService<R, C>
where
    R: TaskRepository + ?Sized,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    buffer: Arc<TaskLogBuffer>,
}

impl<R, C> Clone for TaskQueueService<R, C>
where
    R: TaskRepository + ?Sized,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<R, C> TaskQueueService<R, C>
where
    R: TaskRepository + ?Sized,
    C: Clock + Send + Sync,
{
    /// Creates a queue service with its own log buffer.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self::with_buffer(repository, clock, Arc::new(TaskLogBuffer::new()))
    }

    /// Creates a queue service sharing an existing log buffer.
    #[must_use]
    pub const fn with_buffer(repository: Arc<R>, clock: Arc<C>, buffer: Arc<TaskLogBuffer>) -> Self {
        Self {
            repository,
            clock,
            buffer,
        }
    }

    /// Returns the log buffer.
    #[must_use]
    pub const fn buffer(&self) -> &Arc<TaskLogBuffer> {
        &self.buffer
    }

    /// Persists a new pending task and opens its log buffer.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError`] when the task spec is invalid or persistence
    /// fails.
    pub async fn create_task(&self, spec: TaskSpec) -> TaskQueueResult<TaskId> {
        let task = Task::new(spec, &*self.clock)?;
        self.repository.store(&task).await?;
        self.buffer.init(task.id());
        debug!(
            task_id = %task.id(),
            kind = %task.kind(),
            target_role = %task.target_role(),
            "task created"
        );
        Ok(task.id())
    }

    /// Creates a task and immediately claims it, for work driven
    /// synchronously by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError`] when creation or the claim fails.
    pub async fn create_and_track(&self, spec: TaskSpec) -> TaskQueueResult<TaskId> {
        let task_id = self.create_task(spec).await?;
        self.start_processing(task_id).await?;
        Ok(task_id)
    }

    /// Moves a pending task to processing.
    ///
    /// Unknown identifiers are ignored, as is a task that is already
    /// processing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Domain`] when the task is already terminal,
    /// or [`TaskQueueError::Repository`] when persistence fails.
    pub async fn start_processing(&self, task_id: TaskId) -> TaskQueueResult<()> {
        let Some(mut task) = self.repository.find_by_id(task_id).await? else {
            debug!(%task_id, "start_processing ignored for unknown task");
            return Ok(());
        };
        if task.status() == TaskStatus::Processing {
            return Ok(());
        }
        task.start_processing(&*self.clock)?;
        self.repository.update_lifecycle(&task).await?;
        Ok(())
    }

    /// Completes a task with `output`, flushing its buffered logs.
    ///
    /// A pending task is claimed first so its status history stays
    /// `pending -> processing -> completed`. Completing a terminal task is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] (wrapped) for unknown tasks
    /// or any persistence failure.
    pub async fn complete(&self, task_id: TaskId, output: Value) -> TaskQueueResult<Termination> {
        let mut task = match self.claim_for_termination(task_id).await? {
            Claim::Ready(task) => task,
            Claim::Terminal(status) => return Ok(self.already_terminal(task_id, status)),
        };
        let logs = self.buffer.drain(task_id);
        task.complete(output, logs, &*self.clock)?;
        self.repository.update_lifecycle(&task).await?;
        info!(%task_id, kind = %task.kind(), "task completed");
        Ok(Termination::Applied)
    }

    /// Fails a task with `error`, flushing its buffered logs.
    ///
    /// Symmetric to [`TaskQueueService::complete`]; failing a terminal task
    /// is a no-op that leaves the stored error untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] (wrapped) for unknown tasks
    /// or any persistence failure.
    pub async fn fail(
        &self,
        task_id: TaskId,
        error: impl Into<String> + Send,
    ) -> TaskQueueResult<Termination> {
        let mut task = match self.claim_for_termination(task_id).await? {
            Claim::Ready(task) => task,
            Claim::Terminal(status) => return Ok(self.already_terminal(task_id, status)),
        };
        let message = error.into();
        let logs = self.buffer.drain(task_id);
        task.fail(message.as_str(), logs, &*self.clock)?;
        self.repository.update_lifecycle(&task).await?;
        warn!(%task_id, kind = %task.kind(), error = %message, "task failed");
        Ok(Termination::Applied)
    }

    /// Buffers a log entry for a live task. Entries for unknown or
    /// terminated tasks are dropped.
    pub fn log(&self, task_id: TaskId, entry: TaskLogEntry) {
        if !self.buffer.append(task_id, entry) {
            debug!(%task_id, "log entry dropped, no open buffer");
        }
    }

    /// Returns pending tasks for `target_role` within an organisation,
    /// highest priority first, then oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Repository`] when the lookup fails.
    pub async fn get_pending(
        &self,
        target_role: AgentRole,
        organization_id: OrganizationId,
    ) -> TaskQueueResult<Vec<Task>> {
        Ok(self
            .repository
            .list_pending(organization_id, target_role)
            .await?)
    }

    /// Finds a task owned by `organization_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Repository`] when the lookup fails.
    pub async fn find(
        &self,
        organization_id: OrganizationId,
        task_id: TaskId,
    ) -> TaskQueueResult<Option<Task>> {
        let task = self.repository.find_by_id(task_id).await?;
        Ok(task.filter(|found| found.organization_id() == organization_id))
    }

    /// Returns every task linked to a deal.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Repository`] when the lookup fails.
    pub async fn tasks_for_deal(&self, deal_id: DealId) -> TaskQueueResult<Vec<Task>> {
        Ok(self.repository.find_by_deal(deal_id).await?)
    }

    /// Loads a task and claims it when still pending.
    async fn claim_for_termination(&self, task_id: TaskId) -> TaskQueueResult<Claim> {
        let mut task = self
            .repository
            .find_by_id(task_id)
            .await?
            .ok_or(TaskRepositoryError::NotFound(task_id))?;
        match task.status() {
            status @ (TaskStatus::Completed | TaskStatus::Failed) => Ok(Claim::Terminal(status)),
            TaskStatus::Processing => Ok(Claim::Ready(task)),
            TaskStatus::Pending => {
                task.start_processing(&*self.clock)?;
                self.repository.update_lifecycle(&task).await?;
                Ok(Claim::Ready(task))
            }
        }
    }

    fn already_terminal(&self, task_id: TaskId, status: TaskStatus) -> Termination {
        let discarded = self.buffer.drain(task_id);
        debug!(
            %task_id,
            %status,
            discarded_entries = discarded.len(),
            "termination ignored for terminal task"
        );
        Termination::AlreadyTerminal(status)
    }
}

enum Claim {
    Ready(Task),
    Terminal(TaskStatus),
}
