//! Poller: owns the sweep guards and the polling loop.

use crate::lifecycle::{
    domain::{PollReport, SingleFlightGuard, SweepKind, SweepOutcome, SweepReport},
    ports::{ContentResearcher, ResearchRunRepository},
};
use crate::workflow::services::{PipelineContext, WorkflowEngine};
use mockable::Clock;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// One single-flight guard per sweep.
#[derive(Debug, Default, Clone)]
pub struct SweepGuards {
    stale_offers: SingleFlightGuard,
    early_stage_silence: SingleFlightGuard,
    reopen_lost: SingleFlightGuard,
    satisfaction: SingleFlightGuard,
    research: SingleFlightGuard,
    stale_tasks: SingleFlightGuard,
}

impl SweepGuards {
    /// Returns the guard of `kind`.
    #[must_use]
    pub const fn for_kind(&self, kind: SweepKind) -> &SingleFlightGuard {
        match kind {
            SweepKind::StaleOffers => &self.stale_offers,
            SweepKind::EarlyStageSilence => &self.early_stage_silence,
            SweepKind::ReopenLost => &self.reopen_lost,
            SweepKind::Satisfaction => &self.satisfaction,
            SweepKind::Research => &self.research,
            SweepKind::StaleTasks => &self.stale_tasks,
        }
    }
}

/// Runs the lifecycle sweeps.
pub struct LifecyclePoller<C>
where
    C: Clock + Send + Sync,
{
    pub(super) engine: WorkflowEngine<C>,
    pub(super) research_runs: Arc<dyn ResearchRunRepository>,
    pub(super) researcher: Arc<dyn ContentResearcher>,
    guards: SweepGuards,
}

impl<C> LifecyclePoller<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Creates a poller acting through `engine`.
    #[must_use]
    pub fn new(
        engine: WorkflowEngine<C>,
        research_runs: Arc<dyn ResearchRunRepository>,
        researcher: Arc<dyn ContentResearcher>,
    ) -> Self {
        Self {
            engine,
            research_runs,
            researcher,
            guards: SweepGuards::default(),
        }
    }

    /// Returns the sweep guards.
    #[must_use]
    pub const fn guards(&self) -> &SweepGuards {
        &self.guards
    }

    pub(super) const fn context(&self) -> &PipelineContext<C> {
        self.engine.context()
    }

    /// Runs one sweep unless its previous run is still going.
    pub async fn run_sweep(&self, kind: SweepKind) -> SweepReport {
        let Some(_permit) = self.guards.for_kind(kind).try_acquire() else {
            debug!(sweep = %kind, "sweep already running, skipped");
            return SweepReport {
                kind,
                outcome: SweepOutcome::SkippedOverlap,
            };
        };
        debug!(sweep = %kind, "sweep started");
        let result = match kind {
            SweepKind::StaleOffers => self.sweep_stale_offers().await,
            SweepKind::EarlyStageSilence => self.sweep_early_stage_silence().await,
            SweepKind::ReopenLost => self.sweep_reopen_lost().await,
            SweepKind::Satisfaction => self.sweep_satisfaction().await,
            SweepKind::Research => self.sweep_research().await,
            SweepKind::StaleTasks => self.sweep_stale_tasks().await,
        };
        let outcome = match result {
            Ok(tally) => {
                info!(
                    sweep = %kind,
                    examined = tally.examined,
                    acted = tally.acted,
                    failed = tally.failed,
                    "sweep finished"
                );
                SweepOutcome::Completed(tally)
            }
            Err(err) => {
                warn!(sweep = %kind, error = %err, "sweep failed");
                SweepOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };
        SweepReport { kind, outcome }
    }

    /// Runs every sweep once, in order.
    pub async fn run_all(&self) -> PollReport {
        let mut sweeps = Vec::with_capacity(SweepKind::ALL.len());
        for kind in SweepKind::ALL {
            sweeps.push(self.run_sweep(kind).await);
        }
        PollReport { sweeps }
    }

    /// Polls on the configured interval until `shutdown` turns true or its
    /// sender is dropped.
    #[must_use]
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.context().config().poll_interval();
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = period.as_secs(), "lifecycle poller started");
            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.run_all().await;
                        debug!(acted = report.acted(), "poll pass finished");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            info!("lifecycle poller stopped");
        })
    }
}
