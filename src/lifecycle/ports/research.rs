//! Research run storage and the research collaborator.

use crate::deal::domain::OrganizationId;
use crate::lifecycle::domain::{ResearchRun, ResearchRunId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for research run repository operations.
pub type ResearchRunRepositoryResult<T> = Result<T, ResearchRunRepositoryError>;

/// Research run persistence contract.
#[async_trait]
pub trait ResearchRunRepository: Send + Sync {
    /// Stores a new run.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchRunRepositoryError::Duplicate`] when the id exists.
    async fn store(&self, run: &ResearchRun) -> ResearchRunRepositoryResult<()>;

    /// Replaces a stored run.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchRunRepositoryError::NotFound`] for unknown runs.
    async fn update(&self, run: &ResearchRun) -> ResearchRunRepositoryResult<()>;

    /// Returns the most recently started run of an organisation.
    async fn latest_for(
        &self,
        organization_id: OrganizationId,
    ) -> ResearchRunRepositoryResult<Option<ResearchRun>>;
}

/// Research run repository errors.
#[derive(Debug, Clone, Error)]
pub enum ResearchRunRepositoryError {
    /// A run with the same identifier already exists.
    #[error("duplicate research run identifier: {0}")]
    Duplicate(ResearchRunId),

    /// The run was not found.
    #[error("research run not found: {0}")]
    NotFound(ResearchRunId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ResearchRunRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Research failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("research failed: {0}")]
pub struct ResearchError(pub String);

/// Produces scheduled content research for an organisation.
#[async_trait]
pub trait ContentResearcher: Send + Sync {
    /// Runs one research pass and returns its summary.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError`] when the pass fails.
    async fn research(&self, organization_id: OrganizationId) -> Result<String, ResearchError>;
}
