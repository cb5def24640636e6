//! In-memory research run store and a canned researcher.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::deal::domain::OrganizationId;
use crate::lifecycle::{
    domain::{ResearchRun, ResearchRunId},
    ports::{
        ContentResearcher, ResearchError, ResearchRunRepository, ResearchRunRepositoryError,
        ResearchRunRepositoryResult,
    },
};

fn lock_error(err: impl std::fmt::Display) -> ResearchRunRepositoryError {
    ResearchRunRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

/// Thread-safe in-memory research run repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResearchRunRepository {
    runs: Arc<RwLock<HashMap<ResearchRunId, ResearchRun>>>,
}

impl InMemoryResearchRunRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResearchRunRepository for InMemoryResearchRunRepository {
    async fn store(&self, run: &ResearchRun) -> ResearchRunRepositoryResult<()> {
        let mut runs = self.runs.write().map_err(lock_error)?;
        if runs.contains_key(&run.id()) {
            return Err(ResearchRunRepositoryError::Duplicate(run.id()));
        }
        runs.insert(run.id(), run.clone());
        Ok(())
    }

    async fn update(&self, run: &ResearchRun) -> ResearchRunRepositoryResult<()> {
        let mut runs = self.runs.write().map_err(lock_error)?;
        let existing = runs
            .get_mut(&run.id())
            .ok_or(ResearchRunRepositoryError::NotFound(run.id()))?;
        *existing = run.clone();
        Ok(())
    }

    async fn latest_for(
        &self,
        organization_id: OrganizationId,
    ) -> ResearchRunRepositoryResult<Option<ResearchRun>> {
        let runs = self.runs.read().map_err(lock_error)?;
        Ok(runs
            .values()
            .filter(|run| run.organization_id() == organization_id)
            .max_by_key(|run| run.started_at())
            .cloned())
    }
}

/// Researcher returning a fixed summary and counting its calls.
#[derive(Debug, Default)]
pub struct CannedResearcher {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl CannedResearcher {
    /// Creates a researcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every pass fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns how many passes were requested.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentResearcher for CannedResearcher {
    async fn research(&self, organization_id: OrganizationId) -> Result<String, ResearchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ResearchError("research source offline".to_owned()));
        }
        Ok(format!("research pass {call} for {organization_id}"))
    }
}
