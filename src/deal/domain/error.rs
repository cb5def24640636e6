//! Error types for deal, lead and offer validation.

use super::{DealId, DealStatus, Money, OfferStatus, PendingOfferId};
use thiserror::Error;

/// Errors returned while constructing or mutating deal-domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DealDomainError {
    /// The requested deal status transition is not permitted.
    #[error("invalid deal transition for {deal_id}: {from} -> {to}")]
    InvalidStatusTransition {
        /// Deal whose transition was rejected.
        deal_id: DealId,
        /// Status before the attempted transition.
        from: DealStatus,
        /// Requested target status.
        to: DealStatus,
    },

    /// The offer has already been approved or rejected.
    #[error("pending offer {offer_id} is already {status}")]
    OfferAlreadyResolved {
        /// Offer that was already resolved.
        offer_id: PendingOfferId,
        /// Its resolved status.
        status: OfferStatus,
    },

    /// Offer quantities must be at least one.
    #[error("offer quantity must be at least one")]
    InvalidQuantity,

    /// Prices must not be negative.
    #[error("amount must not be negative: {0}")]
    NegativeAmount(Money),

    /// Tax rate above 100%.
    #[error("tax rate of {0} basis points exceeds 100%")]
    InvalidTaxRate(u32),

    /// An amount overflowed its fixed-point representation.
    #[error("monetary amount overflow")]
    AmountOverflow,

    /// Stored subtotal, tax and total disagree.
    #[error("stored pricing is inconsistent: total differs from subtotal plus tax")]
    InconsistentPricing,

    /// The offered product name is empty after trimming.
    #[error("offer product must not be empty")]
    EmptyProduct,

    /// The lead email address is empty or malformed.
    #[error("invalid lead email address: {0}")]
    InvalidEmail(String),

    /// An invoice has already been recorded for the deal.
    #[error("deal {0} already has an invoice")]
    InvoiceAlreadyRecorded(DealId),
}

/// Error returned while parsing deal statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown deal status: {0}")]
pub struct ParseDealStatusError(pub String);

/// Error returned while parsing offer statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown offer status: {0}")]
pub struct ParseOfferStatusError(pub String);
