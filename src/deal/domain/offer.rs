//! Pending offers awaiting human approval.

use super::{
    DealDomainError, DealId, Money, OrganizationId, ParseOfferStatusError, PendingOfferId,
    Pricing, TaxRate,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Approval state of a pending offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    /// Waiting for a decision.
    Pending,
    /// Approved and sent.
    Approved,
    /// Rejected or superseded by a newer draft.
    Rejected,
}

impl OfferStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for OfferStatus {
    type Error = ParseOfferStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseOfferStatusError(value.to_owned())),
        }
    }
}

/// Proposed terms as drafted by the negotiation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferDraft {
    /// Product or service offered.
    pub product: String,
    /// Number of units.
    pub quantity: u32,
    /// Price per unit before tax.
    pub unit_price: Money,
    /// Short human-readable summary of the terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl OfferDraft {
    /// Computes pricing for these terms.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError`] when the terms are invalid or overflow.
    pub fn price(&self, tax_rate: TaxRate) -> Result<Pricing, DealDomainError> {
        if self.product.trim().is_empty() {
            return Err(DealDomainError::EmptyProduct);
        }
        Pricing::compute(self.quantity, self.unit_price, tax_rate)
    }
}

/// Reviewer edits applied on approval. Absent fields keep the draft value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferEdits {
    /// Replacement product.
    #[serde(default)]
    pub product: Option<String>,
    /// Replacement quantity.
    #[serde(default)]
    pub quantity: Option<u32>,
    /// Replacement unit price.
    #[serde(default)]
    pub unit_price: Option<Money>,
    /// Replacement reply subject.
    #[serde(default)]
    pub subject: Option<String>,
    /// Replacement reply body.
    #[serde(default)]
    pub body: Option<String>,
}

impl OfferEdits {
    /// Creates an empty edit set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Overrides the unit price.
    #[must_use]
    pub const fn with_unit_price(mut self, unit_price: Money) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    /// Overrides the product.
    #[must_use]
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    /// Overrides the reply body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Mail threading references for a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRefs {
    /// Message identifier being replied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    /// Ancestor message identifiers, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

impl ThreadRefs {
    /// Threads a reply under `message_id`.
    #[must_use]
    pub fn replying_to(message_id: impl Into<String>) -> Self {
        let id = message_id.into();
        Self {
            in_reply_to: Some(id.clone()),
            references: vec![id],
        }
    }
}

/// Drafted pricing proposal awaiting explicit approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOffer {
    id: PendingOfferId,
    organization_id: OrganizationId,
    deal_id: DealId,
    draft: OfferDraft,
    pricing: Pricing,
    reply_subject: String,
    reply_body: String,
    thread: ThreadRefs,
    status: OfferStatus,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

/// Reply text and threading for a drafted offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferReply {
    /// Reply subject.
    pub subject: String,
    /// Reply body.
    pub body: String,
    /// Threading references of the inbound message.
    pub thread: ThreadRefs,
}

/// Parameter object for reconstructing a persisted pending offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedOfferData {
    /// Persisted offer identifier.
    pub id: PendingOfferId,
    /// Owning organisation.
    pub organization_id: OrganizationId,
    /// Deal the offer belongs to.
    pub deal_id: DealId,
    /// Drafted terms.
    pub draft: OfferDraft,
    /// Cached pricing of the drafted terms.
    pub pricing: Pricing,
    /// Reply subject.
    pub reply_subject: String,
    /// Reply body.
    pub reply_body: String,
    /// Threading references.
    pub thread: ThreadRefs,
    /// Approval state.
    pub status: OfferStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the offer was approved or rejected.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PendingOffer {
    /// Drafts an offer for `deal_id`, caching the draft's pricing.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError`] when the drafted terms are invalid.
    pub fn new(
        organization_id: OrganizationId,
        deal_id: DealId,
        draft: OfferDraft,
        reply: OfferReply,
        tax_rate: TaxRate,
        clock: &impl Clock,
    ) -> Result<Self, DealDomainError> {
        let pricing = draft.price(tax_rate)?;
        Ok(Self {
            id: PendingOfferId::new(),
            organization_id,
            deal_id,
            draft,
            pricing,
            reply_subject: reply.subject,
            reply_body: reply.body,
            thread: reply.thread,
            status: OfferStatus::Pending,
            created_at: clock.utc(),
            resolved_at: None,
        })
    }

    /// Reconstructs an offer from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedOfferData) -> Self {
        Self {
            id: data.id,
            organization_id: data.organization_id,
            deal_id: data.deal_id,
            draft: data.draft,
            pricing: data.pricing,
            reply_subject: data.reply_subject,
            reply_body: data.reply_body,
            thread: data.thread,
            status: data.status,
            created_at: data.created_at,
            resolved_at: data.resolved_at,
        }
    }

    /// Returns the offer identifier.
    #[must_use]
    pub const fn id(&self) -> PendingOfferId {
        self.id
    }

    /// Returns the owning organisation.
    #[must_use]
    pub const fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    /// Returns the deal the offer belongs to.
    #[must_use]
    pub const fn deal_id(&self) -> DealId {
        self.deal_id
    }

    /// Returns the drafted (or, once approved, the final) terms.
    #[must_use]
    pub const fn draft(&self) -> &OfferDraft {
        &self.draft
    }

    /// Returns the pricing of the current terms.
    #[must_use]
    pub const fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    /// Returns the reply subject.
    #[must_use]
    pub fn reply_subject(&self) -> &str {
        &self.reply_subject
    }

    /// Returns the reply body.
    #[must_use]
    pub fn reply_body(&self) -> &str {
        &self.reply_body
    }

    /// Returns the threading references.
    #[must_use]
    pub const fn thread(&self) -> &ThreadRefs {
        &self.thread
    }

    /// Returns the approval state.
    #[must_use]
    pub const fn status(&self) -> OfferStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the offer was resolved.
    #[must_use]
    pub const fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Returns whether the offer still awaits a decision.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.status == OfferStatus::Pending
    }

    /// Approves the offer, applying `edits` and recomputing pricing from the
    /// resulting terms rather than the cached draft totals.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError::OfferAlreadyResolved`] when the offer was
    /// already decided, or a validation error for invalid edited terms.
    pub fn approve(
        &mut self,
        edits: &OfferEdits,
        tax_rate: TaxRate,
        clock: &impl Clock,
    ) -> Result<Pricing, DealDomainError> {
        self.ensure_unresolved()?;
        let draft = OfferDraft {
            product: edits
                .product
                .clone()
                .unwrap_or_else(|| self.draft.product.clone()),
            quantity: edits.quantity.unwrap_or(self.draft.quantity),
            unit_price: edits.unit_price.unwrap_or(self.draft.unit_price),
            summary: self.draft.summary.clone(),
        };
        let pricing = draft.price(tax_rate)?;

        self.draft = draft;
        self.pricing = pricing;
        if let Some(subject) = &edits.subject {
            self.reply_subject.clone_from(subject);
        }
        if let Some(body) = &edits.body {
            self.reply_body.clone_from(body);
        }
        self.resolve(OfferStatus::Approved, clock);
        Ok(pricing)
    }

    /// Rejects the offer.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError::OfferAlreadyResolved`] when the offer was
    /// already decided.
    pub fn reject(&mut self, clock: &impl Clock) -> Result<(), DealDomainError> {
        self.ensure_unresolved()?;
        self.resolve(OfferStatus::Rejected, clock);
        Ok(())
    }

    const fn ensure_unresolved(&self) -> Result<(), DealDomainError> {
        match self.status {
            OfferStatus::Pending => Ok(()),
            status => Err(DealDomainError::OfferAlreadyResolved {
                offer_id: self.id,
                status,
            }),
        }
    }

    fn resolve(&mut self, status: OfferStatus, clock: &impl Clock) {
        self.status = status;
        self.resolved_at = Some(clock.utc());
    }
}
