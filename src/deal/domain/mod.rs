//! Domain model for deals, leads and pending offers.
//!
//! The deal status is the pipeline state machine. Pricing is fixed-point and
//! only ever replaced as a whole. Pending offers gate priced drafts behind an
//! explicit approval.

mod deal;
mod error;
mod ids;
mod lead;
mod money;
mod offer;

pub use deal::{Deal, DealStatus, PersistedDealData};
pub use error::{DealDomainError, ParseDealStatusError, ParseOfferStatusError};
pub use ids::{DealId, LeadId, OrganizationId, PendingOfferId};
pub use lead::{Lead, LeadProfile, NewLead, PersistedLeadData};
pub use money::{Money, ParseDecimalError, Pricing, TaxRate};
pub use offer::{
    OfferDraft, OfferEdits, OfferReply, OfferStatus, PendingOffer, PersistedOfferData, ThreadRefs,
};
