//! In-memory adapters for deal-context persistence, used by tests and
//! single-process deployments.

mod deal;
mod lead;
mod offer;

pub use deal::InMemoryDealRepository;
pub use lead::InMemoryLeadRepository;
pub use offer::InMemoryPendingOfferRepository;

use crate::deal::ports::DealRepositoryError;

fn lock_error(err: impl std::fmt::Display) -> DealRepositoryError {
    DealRepositoryError::persistence(std::io::Error::other(err.to_string()))
}
