//! Lifecycle poller services.

mod error;
mod poller;
mod sweeps;

pub use error::LifecycleError;
pub use poller::{LifecyclePoller, SweepGuards};
pub use sweeps::{MANUAL_REVIEW_REASON, SUPERSEDED_REASON};
