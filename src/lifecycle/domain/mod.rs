//! Lifecycle domain types.

mod guard;
mod report;
mod research;

pub use guard::{SingleFlightGuard, SingleFlightPermit};
pub use report::{PollReport, SweepKind, SweepOutcome, SweepReport, SweepTally};
pub use research::{ResearchRun, ResearchRunId, ResearchRunStatus};
