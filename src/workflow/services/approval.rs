//! Approval and rejection of pending offers.

use crate::deal::domain::{
    Deal, DealId, DealStatus, Lead, OfferEdits, OrganizationId, PendingOffer,
};
use crate::task::domain::{AgentRole, TaskKind, TaskSpec};
use crate::workflow::{
    domain::{Attachment, ApprovedOffer, OfferResolution, OutboundMessage},
    ports::DocumentTemplate,
    services::{PipelineContext, WorkflowError, WorkflowResult},
};
use mockable::Clock;
use serde_json::{Value, json};
use tracing::info;

/// Resolves offers held for approval.
pub struct OfferApprovalService<C>
where
    C: Clock + Send + Sync,
{
    context: PipelineContext<C>,
}

impl<C> Clone for OfferApprovalService<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<C> OfferApprovalService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates the service.
    #[must_use]
    pub const fn new(context: PipelineContext<C>) -> Self {
        Self { context }
    }

    /// Approves the deal's pending offer with optional edits and sends it.
    ///
    /// Pricing is recomputed from the approved terms. The deal moves to
    /// `offer_sent` and the offer is stored as approved only after the offer
    /// mail has been delivered; a failed send leaves the offer pending.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NoPendingOffer`] when nothing awaits approval,
    /// a validation error for invalid edits, or a transient error when the
    /// document or mail cannot be produced.
    pub async fn approve(
        &self,
        organization_id: OrganizationId,
        deal_id: DealId,
        edits: &OfferEdits,
    ) -> WorkflowResult<ApprovedOffer> {
        let ctx = &self.context;
        let mut deal = ctx.load_deal(organization_id, deal_id).await?;
        let mut offer = self.unresolved_offer(deal_id).await?;
        let lead = ctx.load_lead(organization_id, deal.lead_id()).await?;

        let spec = TaskSpec::new(
            organization_id,
            AgentRole::Orchestrator,
            AgentRole::Outreach,
            TaskKind::SendOffer,
            format!("Send approved offer to {}", lead.company_name()),
        )
        .with_deal(deal_id)
        .with_lead(lead.id())
        .with_input(json!({ "offer_id": offer.id() }));
        let task_id = ctx.begin(spec).await?;
        let outcome = self.send_approved(&mut deal, &lead, &mut offer, edits).await;
        ctx.finish(task_id, outcome).await
    }

    async fn send_approved(
        &self,
        deal: &mut Deal,
        lead: &Lead,
        offer: &mut PendingOffer,
        edits: &OfferEdits,
    ) -> WorkflowResult<(ApprovedOffer, Value)> {
        let ctx = &self.context;
        let clock = ctx.clock();
        let pricing = offer.approve(edits, ctx.config().tax_rate(), clock)?;
        deal.apply_pricing(pricing, clock);
        if deal.status() == DealStatus::Contacted {
            deal.transition_to(DealStatus::InPipeline, clock)?;
        }
        deal.transition_to(DealStatus::OfferSent, clock)?;

        let document = ctx
            .collaborators()
            .documents
            .render(deal, lead, DocumentTemplate::Offer)
            .await?;
        let message = OutboundMessage::new(lead.email(), offer.reply_subject(), offer.reply_body())
            .in_thread(offer.thread().clone())
            .with_attachment(Attachment::pdf(DocumentTemplate::Offer.file_name(deal), document));
        let receipt = ctx.deliver(&message).await?;

        ctx.stores().offers.update(offer).await?;
        ctx.stores().deals.update(deal).await?;
        ctx.close_approval_requests(deal.id(), offer.id(), OfferResolution::Approved)
            .await;
        info!(
            deal_id = %deal.id(),
            offer_id = %offer.id(),
            total = %pricing.total(),
            "offer approved and sent"
        );
        let output = json!({
            "offer_id": offer.id(),
            "total": pricing.total().to_string(),
            "message_id": receipt.message_id,
        });
        Ok((
            ApprovedOffer {
                offer_id: offer.id(),
                pricing,
                message_id: receipt.message_id,
            },
            output,
        ))
    }

    /// Rejects the deal's pending offer.
    ///
    /// A deal already in `offer_sent` keeps that status; an earlier deal
    /// moves to, or stays in, `in_pipeline`. Committed pricing is untouched.
    /// Returns the deal's resulting status.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NoPendingOffer`] when nothing awaits approval.
    pub async fn reject(
        &self,
        organization_id: OrganizationId,
        deal_id: DealId,
    ) -> WorkflowResult<DealStatus> {
        let ctx = &self.context;
        let clock = ctx.clock();
        let mut deal = ctx.load_deal(organization_id, deal_id).await?;
        let mut offer = self.unresolved_offer(deal_id).await?;

        offer.reject(clock)?;
        ctx.stores().offers.update(&offer).await?;
        ctx.close_approval_requests(deal_id, offer.id(), OfferResolution::Rejected)
            .await;
        if deal.status() == DealStatus::Contacted {
            deal.transition_to(DealStatus::InPipeline, clock)?;
            ctx.stores().deals.update(&deal).await?;
        }
        info!(%deal_id, offer_id = %offer.id(), status = %deal.status(), "offer rejected");
        Ok(deal.status())
    }

    async fn unresolved_offer(&self, deal_id: DealId) -> WorkflowResult<PendingOffer> {
        self.context
            .stores()
            .offers
            .find_unresolved_for_deal(deal_id)
            .await?
            .ok_or(WorkflowError::NoPendingOffer(deal_id))
    }
}
