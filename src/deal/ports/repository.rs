//! Repository ports for deals, leads and pending offers.

use crate::deal::domain::{
    Deal, DealId, DealStatus, Lead, LeadId, OrganizationId, PendingOffer, PendingOfferId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for deal-context repository operations.
pub type DealRepositoryResult<T> = Result<T, DealRepositoryError>;

/// Deal persistence contract.
///
/// Single-record reads are scoped to an organisation and return `None` for
/// deals owned by another organisation. `list_by_status` is cross-tenant and
/// reserved for the lifecycle sweeps.
#[async_trait]
pub trait DealRepository: Send + Sync {
    /// Stores a new deal.
    ///
    /// # Errors
    ///
    /// Returns [`DealRepositoryError::DuplicateDeal`] when the identifier
    /// already exists.
    async fn store(&self, deal: &Deal) -> DealRepositoryResult<()>;

    /// Persists the mutable fields of an existing deal (status, pricing,
    /// counters, flags, references, timestamps). Ownership columns are never
    /// rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`DealRepositoryError::DealNotFound`] when the deal does not
    /// exist.
    async fn update(&self, deal: &Deal) -> DealRepositoryResult<()>;

    /// Finds a deal owned by `organization_id`.
    async fn find(
        &self,
        organization_id: OrganizationId,
        id: DealId,
    ) -> DealRepositoryResult<Option<Deal>>;

    /// Lists deals in `status` across all organisations.
    async fn list_by_status(&self, status: DealStatus) -> DealRepositoryResult<Vec<Deal>>;

    /// Deletes a deal owned by `organization_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DealRepositoryError::DealNotFound`] when no such deal exists.
    async fn delete(&self, organization_id: OrganizationId, id: DealId)
    -> DealRepositoryResult<()>;
}

/// Lead persistence contract.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Stores a new lead.
    ///
    /// # Errors
    ///
    /// Returns [`DealRepositoryError::DuplicateLead`] when the identifier
    /// already exists.
    async fn store(&self, lead: &Lead) -> DealRepositoryResult<()>;

    /// Persists profile changes of an existing lead.
    ///
    /// # Errors
    ///
    /// Returns [`DealRepositoryError::LeadNotFound`] when the lead does not
    /// exist.
    async fn update(&self, lead: &Lead) -> DealRepositoryResult<()>;

    /// Finds a lead owned by `organization_id`.
    async fn find(
        &self,
        organization_id: OrganizationId,
        id: LeadId,
    ) -> DealRepositoryResult<Option<Lead>>;

    /// Lists every organisation that owns at least one lead.
    async fn organizations(&self) -> DealRepositoryResult<Vec<OrganizationId>>;
}

/// Pending offer persistence contract.
#[async_trait]
pub trait PendingOfferRepository: Send + Sync {
    /// Stores a new pending offer.
    ///
    /// # Errors
    ///
    /// Returns [`DealRepositoryError::DuplicateOffer`] when the identifier
    /// already exists.
    async fn store(&self, offer: &PendingOffer) -> DealRepositoryResult<()>;

    /// Persists the resolution (status, terms, reply text, timestamps) of an
    /// existing offer.
    ///
    /// # Errors
    ///
    /// Returns [`DealRepositoryError::OfferNotFound`] when the offer does not
    /// exist.
    async fn update(&self, offer: &PendingOffer) -> DealRepositoryResult<()>;

    /// Finds an offer owned by `organization_id`.
    async fn find(
        &self,
        organization_id: OrganizationId,
        id: PendingOfferId,
    ) -> DealRepositoryResult<Option<PendingOffer>>;

    /// Returns the unresolved offer of a deal, if any.
    async fn find_unresolved_for_deal(
        &self,
        deal_id: DealId,
    ) -> DealRepositoryResult<Option<PendingOffer>>;

    /// Lists every offer of a deal, oldest first.
    async fn list_for_deal(&self, deal_id: DealId) -> DealRepositoryResult<Vec<PendingOffer>>;

    /// Deletes every offer of a deal and returns how many were removed.
    async fn delete_for_deal(&self, deal_id: DealId) -> DealRepositoryResult<usize>;
}

/// Errors returned by deal-context repository implementations.
#[derive(Debug, Clone, Error)]
pub enum DealRepositoryError {
    /// A deal with the same identifier already exists.
    #[error("duplicate deal identifier: {0}")]
    DuplicateDeal(DealId),

    /// A lead with the same identifier already exists.
    #[error("duplicate lead identifier: {0}")]
    DuplicateLead(LeadId),

    /// An offer with the same identifier already exists.
    #[error("duplicate pending offer identifier: {0}")]
    DuplicateOffer(PendingOfferId),

    /// The deal was not found.
    #[error("deal not found: {0}")]
    DealNotFound(DealId),

    /// The lead was not found.
    #[error("lead not found: {0}")]
    LeadNotFound(LeadId),

    /// The offer was not found.
    #[error("pending offer not found: {0}")]
    OfferNotFound(PendingOfferId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl DealRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
