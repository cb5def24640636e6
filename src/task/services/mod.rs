//! Application services for the task queue.

mod log_buffer;
mod queue;

pub use log_buffer::TaskLogBuffer;
pub use queue::{TaskQueueError, TaskQueueResult, TaskQueueService, Termination};
