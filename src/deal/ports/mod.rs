//! Port contracts for deal-context persistence.

mod repository;

pub use repository::{
    DealRepository, DealRepositoryError, DealRepositoryResult, LeadRepository,
    PendingOfferRepository,
};
