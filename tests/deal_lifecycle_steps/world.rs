//! Shared world state for deal lifecycle BDD scenarios.

use crate::test_helpers::Pipeline;
use mercator::{
    config::PipelineConfig,
    deal::domain::{DealId, Lead},
    task::domain::TaskId,
    workflow::domain::ApprovedOffer,
};
use rstest::fixture;

/// Scenario world for deal lifecycle behaviour tests.
pub struct DealLifecycleWorld {
    pub pipeline: Option<Pipeline>,
    pub lead: Option<Lead>,
    pub deal_id: Option<DealId>,
    pub task_id: Option<TaskId>,
    pub approved: Option<ApprovedOffer>,
    pub mails_before_poll: usize,
}

impl DealLifecycleWorld {
    /// Creates a world with a default-configured pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipeline: Pipeline::new(PipelineConfig::default()).ok(),
            lead: None,
            deal_id: None,
            task_id: None,
            approved: None,
            mails_before_poll: 0,
        }
    }

    /// Returns the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error when the pipeline could not be wired.
    pub fn pipeline(&self) -> Result<&Pipeline, eyre::Report> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| eyre::eyre!("pipeline failed to initialise"))
    }

    /// Returns the scenario deal.
    ///
    /// # Errors
    ///
    /// Returns an error when no deal was set up.
    pub fn deal_id(&self) -> Result<DealId, eyre::Report> {
        self.deal_id
            .ok_or_else(|| eyre::eyre!("missing deal in scenario world"))
    }

    /// Returns the scenario lead.
    ///
    /// # Errors
    ///
    /// Returns an error when no lead was set up.
    pub fn lead(&self) -> Result<&Lead, eyre::Report> {
        self.lead
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing lead in scenario world"))
    }
}

impl Default for DealLifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> DealLifecycleWorld {
    DealLifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
