//! In-memory repository for the task queue.

use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::deal::domain::{DealId, OrganizationId};
use crate::task::{
    domain::{AgentRole, Task, TaskId, TaskStatus},
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
    deal_index: HashMap<DealId, Vec<TaskId>>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

fn collect_sorted<'a>(tasks: impl Iterator<Item = &'a Task>) -> Vec<Task> {
    let mut matching: Vec<Task> = tasks.cloned().collect();
    matching.sort_by_key(Task::created_at);
    matching
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        if let Some(deal_id) = task.deal_id() {
            state.deal_index.entry(deal_id).or_default().push(task.id());
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update_lifecycle(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let existing = state
            .tasks
            .get_mut(&task.id())
            .ok_or(TaskRepositoryError::NotFound(task.id()))?;
        *existing = task.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn list_pending(
        &self,
        organization_id: OrganizationId,
        target_role: AgentRole,
    ) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(lock_error)?;
        let mut pending: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| {
                task.status() == TaskStatus::Pending
                    && task.organization_id() == organization_id
                    && task.target_role() == target_role
            })
            .cloned()
            .collect();
        pending.sort_by_key(|task| (Reverse(task.priority()), task.created_at()));
        Ok(pending)
    }

    async fn list_by_status(&self, status: TaskStatus) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(collect_sorted(
            state.tasks.values().filter(|task| task.status() == status),
        ))
    }

    async fn find_by_deal(&self, deal_id: DealId) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(lock_error)?;
        let ids = state.deal_index.get(&deal_id).map(Vec::as_slice).unwrap_or_default();
        Ok(collect_sorted(ids.iter().filter_map(|id| state.tasks.get(id))))
    }
}
