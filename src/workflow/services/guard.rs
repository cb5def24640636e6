//! Per-deal exclusion for reply processing.

use crate::deal::domain::DealId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Set of deals whose reply is being processed.
#[derive(Debug, Default, Clone)]
pub struct InFlightDeals {
    deals: Arc<Mutex<HashSet<DealId>>>,
}

impl InFlightDeals {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `deal_id` as in flight, or returns `None` when it already is.
    ///
    /// The mark is cleared when the returned permit drops.
    #[must_use]
    pub fn try_acquire(&self, deal_id: DealId) -> Option<InFlightPermit> {
        let inserted = self
            .deals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(deal_id);
        inserted.then(|| InFlightPermit {
            deals: Arc::clone(&self.deals),
            deal_id,
        })
    }

    /// Returns whether `deal_id` is in flight.
    #[must_use]
    pub fn contains(&self, deal_id: DealId) -> bool {
        self.deals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&deal_id)
    }
}

/// Clears a deal's in-flight mark on drop.
#[derive(Debug)]
pub struct InFlightPermit {
    deals: Arc<Mutex<HashSet<DealId>>>,
    deal_id: DealId,
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.deals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.deal_id);
    }
}
