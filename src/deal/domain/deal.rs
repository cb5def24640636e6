//! Deal aggregate root and the pipeline state machine.

use super::{DealDomainError, DealId, LeadId, OrganizationId, ParseDealStatusError, Pricing};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    /// First outreach has been sent.
    Contacted,
    /// The counterpart has engaged and the deal is being worked.
    InPipeline,
    /// A priced offer has been approved and sent.
    OfferSent,
    /// The counterpart accepted.
    ClosedWon,
    /// The counterpart declined or the deal went stale.
    ClosedLost,
    /// A lost deal was picked up by the reopening sweep; a new deal carries on.
    Reopened,
}

impl DealStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contacted => "contacted",
            Self::InPipeline => "in_pipeline",
            Self::OfferSent => "offer_sent",
            Self::ClosedWon => "closed_won",
            Self::ClosedLost => "closed_lost",
            Self::Reopened => "reopened",
        }
    }

    /// Returns whether the state machine permits `self -> target`.
    ///
    /// `offer_sent -> offer_sent` is the counter-offer self-loop.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Contacted, Self::InPipeline | Self::ClosedLost)
                | (Self::InPipeline, Self::OfferSent | Self::ClosedLost)
                | (
                    Self::OfferSent,
                    Self::OfferSent | Self::ClosedWon | Self::ClosedLost
                )
                | (Self::ClosedLost, Self::Reopened)
        )
    }

    /// Returns whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ClosedWon | Self::Reopened)
    }

    /// Returns whether inbound replies are processed in this status.
    #[must_use]
    pub const fn is_replyable(self) -> bool {
        matches!(self, Self::Contacted | Self::InPipeline | Self::OfferSent)
    }

    /// Returns whether the deal is still before the offer stage.
    #[must_use]
    pub const fn is_early_stage(self) -> bool {
        matches!(self, Self::Contacted | Self::InPipeline)
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DealStatus {
    type Error = ParseDealStatusError;

    /// Parses canonical names and the legacy stage names they replaced.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "contacted" | "prospecting" => Ok(Self::Contacted),
            "in_pipeline" | "negotiating" | "qualified" => Ok(Self::InPipeline),
            "offer_sent" | "proposal_sent" => Ok(Self::OfferSent),
            "closed_won" | "won" => Ok(Self::ClosedWon),
            "closed_lost" | "lost" => Ok(Self::ClosedLost),
            "reopened" => Ok(Self::Reopened),
            _ => Err(ParseDealStatusError(value.to_owned())),
        }
    }
}

/// Deal aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    id: DealId,
    organization_id: OrganizationId,
    lead_id: LeadId,
    status: DealStatus,
    pricing: Option<Pricing>,
    negotiation_round: u32,
    follow_up_count: u32,
    satisfaction_notified: bool,
    invoice_ref: Option<String>,
    last_reply_fingerprint: Option<String>,
    reopened_from: Option<DealId>,
    closed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedDealData {
    /// Persisted deal identifier.
    pub id: DealId,
    /// Owning organisation.
    pub organization_id: OrganizationId,
    /// Lead the deal is negotiated with.
    pub lead_id: LeadId,
    /// Persisted status.
    pub status: DealStatus,
    /// Persisted pricing, if an offer was approved.
    pub pricing: Option<Pricing>,
    /// Persisted negotiation round.
    pub negotiation_round: u32,
    /// Persisted follow-up counter.
    pub follow_up_count: u32,
    /// Whether the satisfaction message was sent.
    pub satisfaction_notified: bool,
    /// Issued invoice reference, if any.
    pub invoice_ref: Option<String>,
    /// Fingerprint of the last processed inbound reply.
    pub last_reply_fingerprint: Option<String>,
    /// Deal this one was reopened from.
    pub reopened_from: Option<DealId>,
    /// When the deal reached a closed status.
    pub closed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    /// Opens a new deal in [`DealStatus::Contacted`].
    #[must_use]
    pub fn new(organization_id: OrganizationId, lead_id: LeadId, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: DealId::new(),
            organization_id,
            lead_id,
            status: DealStatus::Contacted,
            pricing: None,
            negotiation_round: 0,
            follow_up_count: 0,
            satisfaction_notified: false,
            invoice_ref: None,
            last_reply_fingerprint: None,
            reopened_from: None,
            closed_at: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Marks the deal as the successor of a reopened deal.
    #[must_use]
    pub const fn with_reopened_from(mut self, previous: DealId) -> Self {
        self.reopened_from = Some(previous);
        self
    }

    /// Reconstructs a deal from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedDealData) -> Self {
        Self {
            id: data.id,
            organization_id: data.organization_id,
            lead_id: data.lead_id,
            status: data.status,
            pricing: data.pricing,
            negotiation_round: data.negotiation_round,
            follow_up_count: data.follow_up_count,
            satisfaction_notified: data.satisfaction_notified,
            invoice_ref: data.invoice_ref,
            last_reply_fingerprint: data.last_reply_fingerprint,
            reopened_from: data.reopened_from,
            closed_at: data.closed_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the deal identifier.
    #[must_use]
    pub const fn id(&self) -> DealId {
        self.id
    }

    /// Returns the owning organisation.
    #[must_use]
    pub const fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    /// Returns the lead the deal is negotiated with.
    #[must_use]
    pub const fn lead_id(&self) -> LeadId {
        self.lead_id
    }

    /// Returns the current pipeline status.
    #[must_use]
    pub const fn status(&self) -> DealStatus {
        self.status
    }

    /// Returns the committed pricing, if an offer was approved.
    #[must_use]
    pub const fn pricing(&self) -> Option<&Pricing> {
        self.pricing.as_ref()
    }

    /// Returns the number of inbound replies processed.
    #[must_use]
    pub const fn negotiation_round(&self) -> u32 {
        self.negotiation_round
    }

    /// Returns the number of follow-ups sent.
    #[must_use]
    pub const fn follow_up_count(&self) -> u32 {
        self.follow_up_count
    }

    /// Returns whether the satisfaction message was sent.
    #[must_use]
    pub const fn satisfaction_notified(&self) -> bool {
        self.satisfaction_notified
    }

    /// Returns the issued invoice reference, if any.
    #[must_use]
    pub fn invoice_ref(&self) -> Option<&str> {
        self.invoice_ref.as_deref()
    }

    /// Returns the fingerprint of the last processed inbound reply.
    #[must_use]
    pub fn last_reply_fingerprint(&self) -> Option<&str> {
        self.last_reply_fingerprint.as_deref()
    }

    /// Returns the deal this one was reopened from.
    #[must_use]
    pub const fn reopened_from(&self) -> Option<DealId> {
        self.reopened_from
    }

    /// Returns when the deal closed.
    #[must_use]
    pub const fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves the deal to `target`.
    ///
    /// Entering a closed status stamps `closed_at`.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError::InvalidStatusTransition`] when the state
    /// machine forbids the move.
    pub fn transition_to(
        &mut self,
        target: DealStatus,
        clock: &impl Clock,
    ) -> Result<(), DealDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(DealDomainError::InvalidStatusTransition {
                deal_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        if matches!(target, DealStatus::ClosedWon | DealStatus::ClosedLost) {
            self.closed_at = Some(clock.utc());
        }
        self.touch(clock);
        Ok(())
    }

    /// Returns the round the next inbound reply will be processed as,
    /// saturating at `max_rounds`.
    #[must_use]
    pub fn next_round(&self, max_rounds: u32) -> u32 {
        self.negotiation_round.saturating_add(1).min(max_rounds)
    }

    /// Records a processed inbound reply as `round`.
    ///
    /// The round never decreases.
    pub fn record_inbound_reply(
        &mut self,
        round: u32,
        fingerprint: impl Into<String>,
        clock: &impl Clock,
    ) {
        self.negotiation_round = self.negotiation_round.max(round);
        self.last_reply_fingerprint = Some(fingerprint.into());
        self.touch(clock);
    }

    /// Replaces the committed pricing as one unit.
    pub fn apply_pricing(&mut self, pricing: Pricing, clock: &impl Clock) {
        self.pricing = Some(pricing);
        self.touch(clock);
    }

    /// Counts a successfully sent follow-up and returns the new count.
    pub fn record_follow_up(&mut self, clock: &impl Clock) -> u32 {
        self.follow_up_count = self.follow_up_count.saturating_add(1);
        self.touch(clock);
        self.follow_up_count
    }

    /// Marks the satisfaction message as sent.
    pub fn mark_satisfaction_notified(&mut self, clock: &impl Clock) {
        self.satisfaction_notified = true;
        self.touch(clock);
    }

    /// Records the invoice issued for this deal.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError::InvoiceAlreadyRecorded`] when an invoice
    /// reference is already present.
    pub fn record_invoice(
        &mut self,
        invoice_ref: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), DealDomainError> {
        if self.invoice_ref.is_some() {
            return Err(DealDomainError::InvoiceAlreadyRecorded(self.id));
        }
        self.invoice_ref = Some(invoice_ref.into());
        self.touch(clock);
        Ok(())
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
