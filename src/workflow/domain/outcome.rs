//! Results reported by the workflow engine's operations.

use crate::deal::domain::{DealStatus, PendingOfferId, Pricing};
use crate::negotiation::domain::{ActionTag, Guardrail};
use serde::Serialize;

/// Result of checking a deal for a new reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// Nothing new in the inbox.
    NoReply,
    /// The latest reply was already processed.
    Duplicate,
    /// A new reply was negotiated.
    Processed {
        /// Action that stood after guardrails.
        action: ActionTag,
        /// Round the reply was processed as.
        round: u32,
        /// Guardrail that overrode the proposed action.
        guardrail: Option<Guardrail>,
        /// Offer queued for approval by a pricing action.
        pending_offer: Option<PendingOfferId>,
        /// Deal status after the reply was handled.
        status: DealStatus,
    },
}

/// Result of approving a pending offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovedOffer {
    /// Offer that was approved.
    pub offer_id: PendingOfferId,
    /// Pricing recomputed from the approved terms.
    pub pricing: Pricing,
    /// Transport identifier of the sent offer mail.
    pub message_id: Option<String>,
}

/// What a purge removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Open tasks failed with "deal purged".
    pub tasks_failed: usize,
    /// Pending offers deleted.
    pub offers_deleted: usize,
}

/// How a held offer left the approval queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferResolution {
    /// A reviewer approved it and it was sent.
    Approved,
    /// A reviewer rejected it.
    Rejected,
    /// A newer draft replaced it.
    Superseded,
    /// The deal closed while it was still held.
    DealClosed,
}

impl OfferResolution {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Superseded => "superseded",
            Self::DealClosed => "deal_closed",
        }
    }
}
