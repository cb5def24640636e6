//! Ephemeral per-task log accumulator.
//!
//! Entries live in memory until the task terminates, at which point the queue
//! drains them onto the persisted task. Entries buffered for a task whose
//! process crashes before termination are lost.

use crate::task::domain::{TaskId, TaskLogEntry};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// In-memory log buffer keyed by task.
#[derive(Debug, Default)]
pub struct TaskLogBuffer {
    entries: Mutex<HashMap<TaskId, Vec<TaskLogEntry>>>,
}

impl TaskLogBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an empty buffer for `task_id`, discarding any previous one.
    pub fn init(&self, task_id: TaskId) {
        self.lock().insert(task_id, Vec::new());
    }

    /// Appends an entry to the open buffer of `task_id`.
    ///
    /// Returns `false` and drops the entry when no buffer is open, which is
    /// the case for unknown tasks and for tasks already drained.
    pub fn append(&self, task_id: TaskId, entry: TaskLogEntry) -> bool {
        self.lock().get_mut(&task_id).is_some_and(|entries| {
            entries.push(entry);
            true
        })
    }

    /// Removes and returns every entry buffered for `task_id`.
    ///
    /// A second drain for the same task returns an empty list.
    pub fn drain(&self, task_id: TaskId) -> Vec<TaskLogEntry> {
        self.lock().remove(&task_id).unwrap_or_default()
    }

    /// Returns the number of tasks with an open buffer.
    #[must_use]
    pub fn open_buffers(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, Vec<TaskLogEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
