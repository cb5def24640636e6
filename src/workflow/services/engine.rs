//! The workflow engine's operational surface.

use crate::deal::domain::{
    Deal, DealId, DealStatus, Lead, LeadId, NewLead, OfferDraft, OfferEdits, OfferReply,
    OrganizationId, PendingOffer, PendingOfferId,
};
use crate::negotiation::{
    domain::NegotiationAction,
    services::{NegotiationInput, NegotiationOutcome, NegotiationStep},
};
use crate::reasoning::{
    domain::{ReasoningPrompt, ReasoningStep},
    ports::ReasoningService,
    services::StructuredReasoner,
};
use crate::task::domain::{AgentRole, TaskKind, TaskSpec};
use crate::workflow::{
    domain::{
        ApprovedOffer, InboundMessage, OfferResolution, OutboundMessage, PurgeReport,
        ReplyOutcome,
    },
    services::{
        InFlightDeals, OfferApprovalService, PipelineContext, SettlementService, WorkflowError,
        WorkflowResult,
    },
};
use mockable::Clock;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

const OUTREACH_INSTRUCTIONS: &str = "\
You write the first outreach email of a B2B sale. Keep it short, specific to \
the company and free of pricing. Respond with one JSON object with the fields \
\"subject\" and \"body\".";

/// Reason recorded on tasks of a purged deal.
pub const PURGED_REASON: &str = "deal purged";

#[derive(Debug, Deserialize)]
struct OutreachDraft {
    subject: String,
    body: String,
}

/// Drives deals from first contact to settlement.
pub struct WorkflowEngine<C>
where
    C: Clock + Send + Sync,
{
    context: PipelineContext<C>,
    reasoner: StructuredReasoner<dyn ReasoningService>,
    negotiation: Arc<NegotiationStep<dyn ReasoningService>>,
    approvals: OfferApprovalService<C>,
    settlement: SettlementService<C>,
    in_flight: InFlightDeals,
}

impl<C> Clone for WorkflowEngine<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            reasoner: self.reasoner.clone(),
            negotiation: Arc::clone(&self.negotiation),
            approvals: self.approvals.clone(),
            settlement: self.settlement.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<C> WorkflowEngine<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an engine over `context`.
    #[must_use]
    pub fn new(context: PipelineContext<C>) -> Self {
        let reasoning = Arc::clone(&context.collaborators().reasoning);
        Self {
            reasoner: StructuredReasoner::new(Arc::clone(&reasoning)),
            negotiation: Arc::new(NegotiationStep::new(reasoning, context.templates().clone())),
            approvals: OfferApprovalService::new(context.clone()),
            settlement: SettlementService::new(context.clone()),
            in_flight: InFlightDeals::new(),
            context,
        }
    }

    /// Returns the shared pipeline context.
    #[must_use]
    pub const fn context(&self) -> &PipelineContext<C> {
        &self.context
    }

    /// Returns the deals whose reply is being processed.
    #[must_use]
    pub const fn in_flight(&self) -> &InFlightDeals {
        &self.in_flight
    }

    /// Validates and stores a new lead.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Domain`] for invalid contact details, or a
    /// repository error when the lead cannot be stored.
    pub async fn register_lead(
        &self,
        organization_id: OrganizationId,
        new_lead: NewLead,
    ) -> WorkflowResult<Lead> {
        let lead = Lead::new(organization_id, new_lead, self.context.clock())?;
        self.context.stores().leads.store(&lead).await?;
        info!(lead_id = %lead.id(), %organization_id, "lead registered");
        Ok(lead)
    }

    /// Opens a deal for a lead and sends the first outreach.
    ///
    /// The deal is stored in `contacted` before the outreach is drafted so
    /// the outreach task can reference it; a failed outreach fails the task
    /// and leaves the deal for the silence sweep.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::LeadNotFound`], a reasoning error, or
    /// [`WorkflowError::Delivery`] when the outreach is not sent.
    pub async fn trigger_workflow(
        &self,
        organization_id: OrganizationId,
        lead_id: LeadId,
    ) -> WorkflowResult<DealId> {
        self.start(organization_id, lead_id, None).await
    }

    /// Starts a fresh run for a lead cloned from a lost deal; the new deal
    /// records `previous` as its origin.
    ///
    /// # Errors
    ///
    /// As for [`WorkflowEngine::trigger_workflow`].
    pub async fn trigger_reopened(
        &self,
        organization_id: OrganizationId,
        lead_id: LeadId,
        previous: DealId,
    ) -> WorkflowResult<DealId> {
        self.start(organization_id, lead_id, Some(previous)).await
    }

    async fn start(
        &self,
        organization_id: OrganizationId,
        lead_id: LeadId,
        reopened_from: Option<DealId>,
    ) -> WorkflowResult<DealId> {
        let ctx = &self.context;
        let lead = ctx.load_lead(organization_id, lead_id).await?;
        let opened = Deal::new(organization_id, lead_id, ctx.clock());
        let deal = match reopened_from {
            Some(previous) => opened.with_reopened_from(previous),
            None => opened,
        };
        ctx.stores().deals.store(&deal).await?;
        info!(deal_id = %deal.id(), %lead_id, ?reopened_from, "deal opened");

        let spec = TaskSpec::new(
            organization_id,
            AgentRole::Orchestrator,
            AgentRole::Outreach,
            TaskKind::SendOutreach,
            format!("Send first outreach to {}", lead.company_name()),
        )
        .with_deal(deal.id())
        .with_lead(lead_id);
        let task_id = ctx.begin(spec).await?;
        let outcome = self.send_outreach(&lead).await;
        ctx.finish(task_id, outcome).await?;
        Ok(deal.id())
    }

    async fn send_outreach(&self, lead: &Lead) -> WorkflowResult<((), Value)> {
        let draft: OutreachDraft = self.reasoner.decide(&outreach_prompt(lead)).await?;
        let message = OutboundMessage::new(lead.email(), draft.subject, draft.body);
        let receipt = self.context.deliver(&message).await?;
        Ok(((), json!({ "message_id": receipt.message_id })))
    }

    /// Processes the latest reply on a deal, if there is a new one.
    ///
    /// At most one check runs per deal at a time. The negotiation round is
    /// persisted only once the reply has been fully handled; a failure leaves
    /// the deal as it was so the same reply is picked up again.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ReplyInFlight`] when the deal is already being
    /// processed, [`WorkflowError::NotReplyable`] for closed deals, or the
    /// error of whichever step failed.
    pub async fn check_reply(
        &self,
        organization_id: OrganizationId,
        deal_id: DealId,
    ) -> WorkflowResult<ReplyOutcome> {
        let _permit = self
            .in_flight
            .try_acquire(deal_id)
            .ok_or(WorkflowError::ReplyInFlight(deal_id))?;
        let ctx = &self.context;
        let mut deal = ctx.load_deal(organization_id, deal_id).await?;
        if !deal.status().is_replyable() {
            return Err(WorkflowError::NotReplyable {
                deal_id,
                status: deal.status(),
            });
        }
        let mut lead = ctx.load_lead(organization_id, deal.lead_id()).await?;

        let Some(inbound) = ctx
            .collaborators()
            .transport
            .fetch_reply(&deal, &lead)
            .await?
        else {
            debug!(%deal_id, "no reply");
            return Ok(ReplyOutcome::NoReply);
        };
        if deal.last_reply_fingerprint() == Some(inbound.fingerprint()) {
            debug!(%deal_id, "reply already processed");
            return Ok(ReplyOutcome::Duplicate);
        }

        let round = deal.next_round(ctx.config().max_negotiation_rounds());
        let spec = TaskSpec::new(
            organization_id,
            AgentRole::Orchestrator,
            AgentRole::Negotiation,
            TaskKind::NegotiateReply,
            format!("Negotiate reply from {}", lead.company_name()),
        )
        .with_deal(deal_id)
        .with_lead(lead.id())
        .with_input(json!({ "round": round, "fingerprint": inbound.fingerprint() }));
        let task_id = ctx.begin(spec).await?;
        let outcome = self
            .handle_reply(&mut deal, &mut lead, &inbound, round)
            .await;
        ctx.finish(task_id, outcome).await
    }

    async fn handle_reply(
        &self,
        deal: &mut Deal,
        lead: &mut Lead,
        inbound: &InboundMessage,
        round: u32,
    ) -> WorkflowResult<(ReplyOutcome, Value)> {
        let ctx = &self.context;
        let input = NegotiationInput {
            deal,
            lead,
            inbound_subject: inbound.subject(),
            inbound_body: inbound.body(),
            round,
        };
        let outcome = self.negotiation.negotiate(&input, ctx.config()).await?;
        let NegotiationOutcome {
            action,
            subject,
            body,
            guardrail,
            ..
        } = outcome;
        let tag = action.tag();
        deal.record_inbound_reply(round, inbound.fingerprint(), ctx.clock());
        let reply = Reply {
            subject: if subject.trim().is_empty() {
                inbound.reply_subject()
            } else {
                subject
            },
            body,
            inbound,
        };

        let mut pending_offer = None;
        match action {
            NegotiationAction::Discovery => {
                self.send_reply(lead, &reply).await?;
                ctx.stores().deals.update(deal).await?;
            }
            NegotiationAction::Accepted if deal.status() == DealStatus::OfferSent => {
                self.settlement.settle(deal, lead).await?;
            }
            NegotiationAction::Engaged | NegotiationAction::Accepted => {
                self.engage(deal, lead, &reply).await?;
            }
            NegotiationAction::WantsOffer { offer }
            | NegotiationAction::Counter { offer }
            | NegotiationAction::NewOffer { offer } => {
                pending_offer = Some(self.hold_offer(deal, lead, offer, reply, round).await?);
            }
            NegotiationAction::Declined { reason } => {
                self.send_reply(lead, &reply).await?;
                deal.transition_to(DealStatus::ClosedLost, ctx.clock())?;
                ctx.stores().deals.update(deal).await?;
                info!(deal_id = %deal.id(), %reason, "deal declined");
            }
        }

        info!(deal_id = %deal.id(), round, action = %tag, status = %deal.status(), "reply processed");
        let result = ReplyOutcome::Processed {
            action: tag,
            round,
            guardrail,
            pending_offer,
            status: deal.status(),
        };
        let output = json!({
            "action": tag,
            "round": round,
            "guardrail": guardrail,
            "pending_offer": pending_offer,
            "status": deal.status(),
        });
        Ok((result, output))
    }

    async fn engage(&self, deal: &mut Deal, lead: &mut Lead, reply: &Reply<'_>) -> WorkflowResult<()> {
        let ctx = &self.context;
        if deal.status() == DealStatus::Contacted {
            deal.transition_to(DealStatus::InPipeline, ctx.clock())?;
        }
        self.send_reply(lead, reply).await?;
        if lead.mark_informed(ctx.clock()) {
            ctx.stores().leads.update(lead).await?;
        }
        ctx.stores().deals.update(deal).await?;
        Ok(())
    }

    /// Holds drafted terms for approval, superseding any earlier pending
    /// offer, and asks a reviewer to decide.
    async fn hold_offer(
        &self,
        deal: &mut Deal,
        lead: &Lead,
        draft: OfferDraft,
        reply: Reply<'_>,
        round: u32,
    ) -> WorkflowResult<PendingOfferId> {
        let ctx = &self.context;
        let clock = ctx.clock();
        if deal.status() == DealStatus::Contacted {
            deal.transition_to(DealStatus::InPipeline, clock)?;
        }
        let offers = &ctx.stores().offers;
        if let Some(mut previous) = offers.find_unresolved_for_deal(deal.id()).await? {
            previous.reject(clock)?;
            offers.update(&previous).await?;
            ctx.close_approval_requests(deal.id(), previous.id(), OfferResolution::Superseded)
                .await;
            info!(deal_id = %deal.id(), offer_id = %previous.id(), "pending offer superseded");
        }

        let offer = PendingOffer::new(
            deal.organization_id(),
            deal.id(),
            draft,
            OfferReply {
                subject: reply.subject,
                body: reply.body,
                thread: reply.inbound.reply_thread(),
            },
            ctx.config().tax_rate(),
            clock,
        )?;
        offers.store(&offer).await?;
        ctx.stores().deals.update(deal).await?;

        let spec = TaskSpec::new(
            deal.organization_id(),
            AgentRole::Orchestrator,
            AgentRole::Notification,
            TaskKind::NotifyOfferApproval,
            format!("Approve offer for {}", lead.company_name()),
        )
        .with_deal(deal.id())
        .with_lead(lead.id())
        .with_priority(1)
        .with_input(json!({
            "offer_id": offer.id(),
            "round": round,
            "total": offer.pricing().total().to_string(),
        }));
        ctx.queue().create_task(spec).await?;
        info!(deal_id = %deal.id(), offer_id = %offer.id(), "offer held for approval");
        Ok(offer.id())
    }

    async fn send_reply(&self, lead: &Lead, reply: &Reply<'_>) -> WorkflowResult<()> {
        let message = OutboundMessage::new(lead.email(), reply.subject.as_str(), reply.body.as_str())
            .in_thread(reply.inbound.reply_thread());
        self.context.deliver(&message).await?;
        Ok(())
    }

    /// Approves the deal's pending offer, see [`OfferApprovalService::approve`].
    ///
    /// # Errors
    ///
    /// See [`OfferApprovalService::approve`].
    pub async fn approve_offer(
        &self,
        organization_id: OrganizationId,
        deal_id: DealId,
        edits: &OfferEdits,
    ) -> WorkflowResult<ApprovedOffer> {
        self.approvals.approve(organization_id, deal_id, edits).await
    }

    /// Rejects the deal's pending offer, see [`OfferApprovalService::reject`].
    ///
    /// # Errors
    ///
    /// See [`OfferApprovalService::reject`].
    pub async fn reject_offer(
        &self,
        organization_id: OrganizationId,
        deal_id: DealId,
    ) -> WorkflowResult<DealStatus> {
        self.approvals.reject(organization_id, deal_id).await
    }

    /// Deletes a deal with its offers, failing its open tasks first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::DealNotFound`] or a storage error.
    pub async fn purge_deal(
        &self,
        organization_id: OrganizationId,
        deal_id: DealId,
    ) -> WorkflowResult<PurgeReport> {
        let ctx = &self.context;
        ctx.load_deal(organization_id, deal_id).await?;
        let mut tasks_failed = 0_usize;
        for task in ctx.queue().tasks_for_deal(deal_id).await? {
            if !task.status().is_terminal() {
                ctx.queue().fail(task.id(), PURGED_REASON).await?;
                tasks_failed = tasks_failed.saturating_add(1);
            }
        }
        let offers_deleted = ctx.stores().offers.delete_for_deal(deal_id).await?;
        ctx.stores().deals.delete(organization_id, deal_id).await?;
        info!(%deal_id, tasks_failed, offers_deleted, "deal purged");
        Ok(PurgeReport {
            tasks_failed,
            offers_deleted,
        })
    }
}

struct Reply<'a> {
    subject: String,
    body: String,
    inbound: &'a InboundMessage,
}

fn outreach_prompt(lead: &Lead) -> ReasoningPrompt {
    let profile = lead.profile();
    let mut lines = vec![format!("Company: {}", lead.company_name())];
    if let Some(contact) = lead.contact_name() {
        lines.push(format!("Contact: {contact}"));
    }
    if let Some(industry) = &profile.industry {
        lines.push(format!("Industry: {industry}"));
    }
    lines.extend(profile.notes.iter().map(|note| format!("Note: {note}")));
    ReasoningPrompt::new(ReasoningStep::Outreach, OUTREACH_INSTRUCTIONS, lines.join("\n"))
}
