//! Sweep-level failures.

use crate::deal::ports::DealRepositoryError;
use crate::lifecycle::ports::ResearchRunRepositoryError;
use crate::task::{ports::TaskRepositoryError, services::TaskQueueError};
use crate::workflow::services::WorkflowError;
use thiserror::Error;

/// Errors that stop a sweep before it has examined its candidates.
///
/// Failures on a single candidate are logged and counted instead.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Deal or lead storage failed.
    #[error(transparent)]
    Deals(#[from] DealRepositoryError),
    /// Task storage failed.
    #[error(transparent)]
    Tasks(#[from] TaskRepositoryError),
    /// The task queue failed.
    #[error(transparent)]
    Queue(#[from] TaskQueueError),
    /// Research run storage failed.
    #[error(transparent)]
    ResearchRuns(#[from] ResearchRunRepositoryError),
    /// A workflow operation failed.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}
