//! In-memory deal repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::lock_error;
use crate::deal::{
    domain::{Deal, DealId, DealStatus, OrganizationId},
    ports::{DealRepository, DealRepositoryError, DealRepositoryResult},
};

/// Thread-safe in-memory deal repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDealRepository {
    deals: Arc<RwLock<HashMap<DealId, Deal>>>,
}

impl InMemoryDealRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DealRepository for InMemoryDealRepository {
    async fn store(&self, deal: &Deal) -> DealRepositoryResult<()> {
        let mut deals = self.deals.write().map_err(lock_error)?;
        if deals.contains_key(&deal.id()) {
            return Err(DealRepositoryError::DuplicateDeal(deal.id()));
        }
        deals.insert(deal.id(), deal.clone());
        Ok(())
    }

    async fn update(&self, deal: &Deal) -> DealRepositoryResult<()> {
        let mut deals = self.deals.write().map_err(lock_error)?;
        let existing = deals
            .get_mut(&deal.id())
            .ok_or(DealRepositoryError::DealNotFound(deal.id()))?;
        *existing = deal.clone();
        Ok(())
    }

    async fn find(
        &self,
        organization_id: OrganizationId,
        id: DealId,
    ) -> DealRepositoryResult<Option<Deal>> {
        let deals = self.deals.read().map_err(lock_error)?;
        Ok(deals
            .get(&id)
            .filter(|deal| deal.organization_id() == organization_id)
            .cloned())
    }

    async fn list_by_status(&self, status: DealStatus) -> DealRepositoryResult<Vec<Deal>> {
        let deals = self.deals.read().map_err(lock_error)?;
        let mut matching: Vec<Deal> = deals
            .values()
            .filter(|deal| deal.status() == status)
            .cloned()
            .collect();
        matching.sort_by_key(Deal::updated_at);
        Ok(matching)
    }

    async fn delete(
        &self,
        organization_id: OrganizationId,
        id: DealId,
    ) -> DealRepositoryResult<()> {
        let mut deals = self.deals.write().map_err(lock_error)?;
        let owned = deals
            .get(&id)
            .is_some_and(|deal| deal.organization_id() == organization_id);
        if !owned {
            return Err(DealRepositoryError::DealNotFound(id));
        }
        deals.remove(&id);
        Ok(())
    }
}
