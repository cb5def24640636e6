//! What a sweep pass did.

use serde::Serialize;
use std::fmt;

/// The six lifecycle sweeps, in the order a pass runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Follow up on offers left unanswered.
    StaleOffers,
    /// Close (or nudge) early-stage deals gone silent.
    EarlyStageSilence,
    /// Reopen deals lost long enough ago.
    ReopenLost,
    /// Send one satisfaction check after a win.
    Satisfaction,
    /// Run scheduled content research.
    Research,
    /// Retry or surface stuck tasks.
    StaleTasks,
}

impl SweepKind {
    /// Every sweep in pass order.
    pub const ALL: [Self; 6] = [
        Self::StaleOffers,
        Self::EarlyStageSilence,
        Self::ReopenLost,
        Self::Satisfaction,
        Self::Research,
        Self::StaleTasks,
    ];

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StaleOffers => "stale_offers",
            Self::EarlyStageSilence => "early_stage_silence",
            Self::ReopenLost => "reopen_lost",
            Self::Satisfaction => "satisfaction",
            Self::Research => "research",
            Self::StaleTasks => "stale_tasks",
        }
    }
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts gathered while a sweep runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepTally {
    /// Candidates inspected.
    pub examined: usize,
    /// Candidates the sweep changed.
    pub acted: usize,
    /// Candidates whose handling failed; they are retried next pass.
    pub failed: usize,
}

impl SweepTally {
    pub(crate) const fn record(&mut self, acted: bool) {
        self.examined = self.examined.saturating_add(1);
        if acted {
            self.acted = self.acted.saturating_add(1);
        }
    }

    pub(crate) const fn record_failure(&mut self) {
        self.examined = self.examined.saturating_add(1);
        self.failed = self.failed.saturating_add(1);
    }
}

/// How a sweep ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SweepOutcome {
    /// The sweep ran to the end.
    Completed(SweepTally),
    /// The previous run of this sweep was still going.
    SkippedOverlap,
    /// The sweep could not list its candidates.
    Failed {
        /// Failure description.
        error: String,
    },
}

/// Result of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Which sweep ran.
    pub kind: SweepKind,
    /// How it ended.
    pub outcome: SweepOutcome,
}

impl SweepReport {
    /// Returns the tally of a completed sweep.
    #[must_use]
    pub const fn tally(&self) -> Option<&SweepTally> {
        match &self.outcome {
            SweepOutcome::Completed(tally) => Some(tally),
            SweepOutcome::SkippedOverlap | SweepOutcome::Failed { .. } => None,
        }
    }
}

/// Result of one full poller pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    /// One report per sweep, in pass order.
    pub sweeps: Vec<SweepReport>,
}

impl PollReport {
    /// Returns the report for `kind`.
    #[must_use]
    pub fn sweep(&self, kind: SweepKind) -> Option<&SweepReport> {
        self.sweeps.iter().find(|report| report.kind == kind)
    }

    /// Returns the total number of candidates changed.
    #[must_use]
    pub fn acted(&self) -> usize {
        self.sweeps
            .iter()
            .filter_map(SweepReport::tally)
            .map(|tally| tally.acted)
            .sum()
    }
}
