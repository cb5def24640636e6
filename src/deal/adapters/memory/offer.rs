//! In-memory pending offer repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::lock_error;
use crate::deal::{
    domain::{DealId, OrganizationId, PendingOffer, PendingOfferId},
    ports::{DealRepositoryError, DealRepositoryResult, PendingOfferRepository},
};

/// Thread-safe in-memory pending offer repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPendingOfferRepository {
    offers: Arc<RwLock<HashMap<PendingOfferId, PendingOffer>>>,
}

impl InMemoryPendingOfferRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingOfferRepository for InMemoryPendingOfferRepository {
    async fn store(&self, offer: &PendingOffer) -> DealRepositoryResult<()> {
        let mut offers = self.offers.write().map_err(lock_error)?;
        if offers.contains_key(&offer.id()) {
            return Err(DealRepositoryError::DuplicateOffer(offer.id()));
        }
        offers.insert(offer.id(), offer.clone());
        Ok(())
    }

    async fn update(&self, offer: &PendingOffer) -> DealRepositoryResult<()> {
        let mut offers = self.offers.write().map_err(lock_error)?;
        let existing = offers
            .get_mut(&offer.id())
            .ok_or(DealRepositoryError::OfferNotFound(offer.id()))?;
        *existing = offer.clone();
        Ok(())
    }

    async fn find(
        &self,
        organization_id: OrganizationId,
        id: PendingOfferId,
    ) -> DealRepositoryResult<Option<PendingOffer>> {
        let offers = self.offers.read().map_err(lock_error)?;
        Ok(offers
            .get(&id)
            .filter(|offer| offer.organization_id() == organization_id)
            .cloned())
    }

    async fn find_unresolved_for_deal(
        &self,
        deal_id: DealId,
    ) -> DealRepositoryResult<Option<PendingOffer>> {
        let offers = self.offers.read().map_err(lock_error)?;
        Ok(offers
            .values()
            .filter(|offer| offer.deal_id() == deal_id && offer.is_unresolved())
            .max_by_key(|offer| offer.created_at())
            .cloned())
    }

    async fn list_for_deal(&self, deal_id: DealId) -> DealRepositoryResult<Vec<PendingOffer>> {
        let offers = self.offers.read().map_err(lock_error)?;
        let mut matching: Vec<PendingOffer> = offers
            .values()
            .filter(|offer| offer.deal_id() == deal_id)
            .cloned()
            .collect();
        matching.sort_by_key(PendingOffer::created_at);
        Ok(matching)
    }

    async fn delete_for_deal(&self, deal_id: DealId) -> DealRepositoryResult<usize> {
        let mut offers = self.offers.write().map_err(lock_error)?;
        let before = offers.len();
        offers.retain(|_, offer| offer.deal_id() != deal_id);
        Ok(before - offers.len())
    }
}
