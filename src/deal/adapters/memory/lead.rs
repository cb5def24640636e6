//! In-memory lead repository.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use super::lock_error;
use crate::deal::{
    domain::{Lead, LeadId, OrganizationId},
    ports::{DealRepositoryError, DealRepositoryResult, LeadRepository},
};

/// Thread-safe in-memory lead repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLeadRepository {
    leads: Arc<RwLock<HashMap<LeadId, Lead>>>,
}

impl InMemoryLeadRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn store(&self, lead: &Lead) -> DealRepositoryResult<()> {
        let mut leads = self.leads.write().map_err(lock_error)?;
        if leads.contains_key(&lead.id()) {
            return Err(DealRepositoryError::DuplicateLead(lead.id()));
        }
        leads.insert(lead.id(), lead.clone());
        Ok(())
    }

    async fn update(&self, lead: &Lead) -> DealRepositoryResult<()> {
        let mut leads = self.leads.write().map_err(lock_error)?;
        let existing = leads
            .get_mut(&lead.id())
            .ok_or(DealRepositoryError::LeadNotFound(lead.id()))?;
        *existing = lead.clone();
        Ok(())
    }

    async fn find(
        &self,
        organization_id: OrganizationId,
        id: LeadId,
    ) -> DealRepositoryResult<Option<Lead>> {
        let leads = self.leads.read().map_err(lock_error)?;
        Ok(leads
            .get(&id)
            .filter(|lead| lead.organization_id() == organization_id)
            .cloned())
    }

    async fn organizations(&self) -> DealRepositoryResult<Vec<OrganizationId>> {
        let leads = self.leads.read().map_err(lock_error)?;
        let organizations: BTreeSet<OrganizationId> =
            leads.values().map(Lead::organization_id).collect();
        Ok(organizations.into_iter().collect())
    }
}
