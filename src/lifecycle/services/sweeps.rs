//! The six sweeps.
//!
//! Each sweep lists its candidates, handles them one at a time and tallies
//! the result. A failure on one candidate is logged and counted; the
//! candidate stays as it was and is seen again on the next pass.

use crate::deal::domain::{Deal, DealStatus, Lead, OrganizationId};
use crate::lifecycle::{
    domain::{ResearchRun, ResearchRunStatus, SweepTally},
    services::{LifecycleError, LifecyclePoller},
};
use crate::task::{
    domain::{AgentRole, Task, TaskKind, TaskSpec, TaskStatus},
    services::TaskQueueError,
};
use crate::templates::{MessageTemplate, TemplateContext};
use crate::workflow::{
    domain::{OfferResolution, OutboundMessage},
    services::{PipelineContext, WorkflowResult},
};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

/// Error recorded on a stale task that a fresh attempt replaces.
pub const SUPERSEDED_REASON: &str = "superseded by retry";

/// Error recorded on a stale task that must not be retried automatically.
pub const MANUAL_REVIEW_REASON: &str = "stale task requires manual review";

const RESEARCH_TIMED_OUT: &str = "research run timed out";

impl<C> LifecyclePoller<C>
where
    C: Clock + Send + Sync + 'static,
{
    pub(super) async fn sweep_stale_offers(&self) -> Result<SweepTally, LifecycleError> {
        let ctx = self.context();
        let now = ctx.clock().utc();
        let stale_after = ctx.config().stale_after();
        let mut tally = SweepTally::default();
        for deal in ctx.stores().deals.list_by_status(DealStatus::OfferSent).await? {
            if now - deal.updated_at() < stale_after {
                continue;
            }
            let deal_id = deal.id();
            match self.follow_up_offer(deal).await {
                Ok(acted) => tally.record(acted),
                Err(err) => {
                    warn!(%deal_id, error = %err, "offer follow-up failed");
                    tally.record_failure();
                }
            }
        }
        Ok(tally)
    }

    async fn follow_up_offer(&self, mut deal: Deal) -> WorkflowResult<bool> {
        let ctx = self.context();
        let max_attempts = ctx.config().max_follow_up_attempts();
        if deal.follow_up_count() < max_attempts {
            let lead = ctx.load_lead(deal.organization_id(), deal.lead_id()).await?;
            let attempt = deal.follow_up_count().saturating_add(1);
            let values = TemplateContext {
                total: deal.pricing().map(|pricing| pricing.total().to_string()),
                attempt,
                max_attempts,
                ..PipelineContext::<C>::template_context(&lead)
            };
            self.send_scheduled(&deal, &lead, MessageTemplate::FollowUp, &values)
                .await?;
            let count = deal.record_follow_up(ctx.clock());
            info!(deal_id = %deal.id(), follow_up = count, "offer follow-up sent");
        }
        if deal.follow_up_count() >= max_attempts {
            self.withdraw_held_offer(&deal).await?;
            deal.transition_to(DealStatus::ClosedLost, ctx.clock())?;
            info!(
                deal_id = %deal.id(),
                follow_ups = deal.follow_up_count(),
                "offer unanswered, deal closed lost"
            );
        }
        ctx.stores().deals.update(&deal).await?;
        Ok(true)
    }

    pub(super) async fn sweep_early_stage_silence(&self) -> Result<SweepTally, LifecycleError> {
        let ctx = self.context();
        let mut tally = SweepTally::default();
        for status in [DealStatus::Contacted, DealStatus::InPipeline] {
            for deal in ctx.stores().deals.list_by_status(status).await? {
                let deal_id = deal.id();
                match self.handle_silence(deal).await {
                    Ok(acted) => tally.record(acted),
                    Err(err) => {
                        warn!(%deal_id, error = %err, "silence handling failed");
                        tally.record_failure();
                    }
                }
            }
        }
        Ok(tally)
    }

    async fn handle_silence(&self, mut deal: Deal) -> WorkflowResult<bool> {
        let ctx = self.context();
        let config = ctx.config();
        let idle = ctx.clock().utc() - deal.updated_at();
        let max_attempts = config.max_follow_up_attempts();
        if deal.follow_up_count() >= max_attempts {
            if idle < config.silence_after() {
                return Ok(false);
            }
            self.withdraw_held_offer(&deal).await?;
            deal.transition_to(DealStatus::ClosedLost, ctx.clock())?;
            ctx.stores().deals.update(&deal).await?;
            info!(deal_id = %deal.id(), idle_days = idle.num_days(), "silent deal closed lost");
            return Ok(true);
        }
        if !config.early_stage_nudges() || idle < config.stale_after() {
            return Ok(false);
        }
        let lead = ctx.load_lead(deal.organization_id(), deal.lead_id()).await?;
        let values = TemplateContext {
            attempt: deal.follow_up_count().saturating_add(1),
            max_attempts,
            ..PipelineContext::<C>::template_context(&lead)
        };
        self.send_scheduled(&deal, &lead, MessageTemplate::Nudge, &values)
            .await?;
        let count = deal.record_follow_up(ctx.clock());
        ctx.stores().deals.update(&deal).await?;
        info!(deal_id = %deal.id(), nudge = count, "early-stage nudge sent");
        Ok(true)
    }

    /// Rejects the offer still held for a deal that is about to close.
    async fn withdraw_held_offer(&self, deal: &Deal) -> WorkflowResult<()> {
        let ctx = self.context();
        let offers = &ctx.stores().offers;
        let Some(mut offer) = offers.find_unresolved_for_deal(deal.id()).await? else {
            return Ok(());
        };
        offer.reject(ctx.clock())?;
        offers.update(&offer).await?;
        ctx.close_approval_requests(deal.id(), offer.id(), OfferResolution::DealClosed)
            .await;
        info!(deal_id = %deal.id(), offer_id = %offer.id(), "held offer withdrawn on close");
        Ok(())
    }

    /// Returns whether a completed task of `kind` on the deal matches `input`.
    async fn already_delivered(
        &self,
        deal: &Deal,
        kind: TaskKind,
        input: impl Fn(&Value) -> bool + Send,
    ) -> WorkflowResult<bool> {
        let tasks = self.context().queue().tasks_for_deal(deal.id()).await?;
        Ok(tasks.iter().any(|task| {
            task.kind() == kind && task.status() == TaskStatus::Completed && input(task.input())
        }))
    }

    async fn send_scheduled(
        &self,
        deal: &Deal,
        lead: &Lead,
        template: MessageTemplate,
        values: &TemplateContext,
    ) -> WorkflowResult<()> {
        let ctx = self.context();
        let input = json!({ "template": template.name(), "attempt": values.attempt });
        if self
            .already_delivered(deal, TaskKind::SendFollowUp, |sent| *sent == input)
            .await?
        {
            debug!(deal_id = %deal.id(), attempt = values.attempt, "scheduled mail already sent");
            return Ok(());
        }
        let spec = TaskSpec::new(
            deal.organization_id(),
            AgentRole::Orchestrator,
            AgentRole::Outreach,
            TaskKind::SendFollowUp,
            format!("Send {} to {}", template.name(), lead.company_name()),
        )
        .with_deal(deal.id())
        .with_lead(lead.id())
        .with_input(input);
        let task_id = ctx.begin(spec).await?;
        let subject = match template {
            MessageTemplate::Nudge => format!("Checking in with {}", lead.company_name()),
            _ => format!("Following up on our proposal to {}", lead.company_name()),
        };
        let outcome = self.send_template(lead, subject, template, values).await;
        ctx.finish(task_id, outcome).await
    }

    async fn send_template(
        &self,
        lead: &Lead,
        subject: String,
        template: MessageTemplate,
        values: &TemplateContext,
    ) -> WorkflowResult<((), Value)> {
        let ctx = self.context();
        let body = ctx.templates().render(template, values)?;
        let receipt = ctx
            .deliver(&OutboundMessage::new(lead.email(), subject, body))
            .await?;
        Ok(((), json!({ "message_id": receipt.message_id })))
    }

    pub(super) async fn sweep_reopen_lost(&self) -> Result<SweepTally, LifecycleError> {
        let ctx = self.context();
        let now = ctx.clock().utc();
        let reopen_after = ctx.config().reopen_after();
        let mut tally = SweepTally::default();
        for deal in ctx.stores().deals.list_by_status(DealStatus::ClosedLost).await? {
            let closed_at = deal.closed_at().unwrap_or_else(|| deal.updated_at());
            if now - closed_at < reopen_after {
                continue;
            }
            let deal_id = deal.id();
            match self.reopen(deal).await {
                Ok(()) => tally.record(true),
                Err(err) => {
                    warn!(%deal_id, error = %err, "reopening failed");
                    tally.record_failure();
                }
            }
        }
        Ok(tally)
    }

    async fn reopen(&self, mut deal: Deal) -> WorkflowResult<()> {
        let ctx = self.context();
        let organization_id = deal.organization_id();
        let lead = ctx.load_lead(organization_id, deal.lead_id()).await?;
        deal.transition_to(DealStatus::Reopened, ctx.clock())?;
        ctx.stores().deals.update(&deal).await?;

        let fresh = lead.clone_for_reopen(ctx.clock());
        ctx.stores().leads.store(&fresh).await?;
        let spec = TaskSpec::new(
            organization_id,
            AgentRole::Orchestrator,
            AgentRole::Orchestrator,
            TaskKind::ReopenDeal,
            format!("Reopen deal with {}", lead.company_name()),
        )
        .with_deal(deal.id())
        .with_lead(fresh.id());
        let task_id = ctx.begin(spec).await?;
        let outcome = self
            .engine
            .trigger_reopened(organization_id, fresh.id(), deal.id())
            .await
            .map(|new_deal| (new_deal, json!({ "deal_id": new_deal })));
        let new_deal = ctx.finish(task_id, outcome).await?;
        info!(previous = %deal.id(), deal_id = %new_deal, lead_id = %fresh.id(), "lost deal reopened");
        Ok(())
    }

    pub(super) async fn sweep_satisfaction(&self) -> Result<SweepTally, LifecycleError> {
        let ctx = self.context();
        let now = ctx.clock().utc();
        let opens = ctx.config().satisfaction_after();
        let closes = opens + Duration::days(1);
        let mut tally = SweepTally::default();
        for deal in ctx.stores().deals.list_by_status(DealStatus::ClosedWon).await? {
            if deal.satisfaction_notified() {
                continue;
            }
            let age = now - deal.closed_at().unwrap_or_else(|| deal.updated_at());
            if age < opens || age >= closes {
                continue;
            }
            let deal_id = deal.id();
            match self.check_satisfaction(deal).await {
                Ok(()) => tally.record(true),
                Err(err) => {
                    warn!(%deal_id, error = %err, "satisfaction check failed");
                    tally.record_failure();
                }
            }
        }
        Ok(tally)
    }

    async fn check_satisfaction(&self, mut deal: Deal) -> WorkflowResult<()> {
        let ctx = self.context();
        if !self
            .already_delivered(&deal, TaskKind::SendSatisfactionCheck, |_| true)
            .await?
        {
            self.send_satisfaction_check(&deal).await?;
        }
        deal.mark_satisfaction_notified(ctx.clock());
        ctx.stores().deals.update(&deal).await?;
        info!(deal_id = %deal.id(), "satisfaction check sent");
        Ok(())
    }

    async fn send_satisfaction_check(&self, deal: &Deal) -> WorkflowResult<()> {
        let ctx = self.context();
        let lead = ctx.load_lead(deal.organization_id(), deal.lead_id()).await?;
        let spec = TaskSpec::new(
            deal.organization_id(),
            AgentRole::Orchestrator,
            AgentRole::Notification,
            TaskKind::SendSatisfactionCheck,
            format!("Ask {} about satisfaction", lead.company_name()),
        )
        .with_deal(deal.id())
        .with_lead(lead.id());
        let task_id = ctx.begin(spec).await?;
        let values = TemplateContext {
            invoice_ref: deal.invoice_ref().map(str::to_owned),
            ..PipelineContext::<C>::template_context(&lead)
        };
        let subject = format!("How is it going, {}?", values.contact);
        let outcome = self
            .send_template(&lead, subject, MessageTemplate::Satisfaction, &values)
            .await;
        ctx.finish(task_id, outcome).await
    }

    pub(super) async fn sweep_research(&self) -> Result<SweepTally, LifecycleError> {
        let ctx = self.context();
        let mut tally = SweepTally::default();
        for organization_id in ctx.stores().leads.organizations().await? {
            match self.research_for(organization_id).await {
                Ok(acted) => tally.record(acted),
                Err(err) => {
                    warn!(%organization_id, error = %err, "research run failed");
                    tally.record_failure();
                }
            }
        }
        Ok(tally)
    }

    async fn research_for(
        &self,
        organization_id: OrganizationId,
    ) -> Result<bool, LifecycleError> {
        let ctx = self.context();
        let config = ctx.config();
        let now = ctx.clock().utc();
        if let Some(mut latest) = self.research_runs.latest_for(organization_id).await? {
            if latest.is_live(config.research_run_timeout(), now) {
                debug!(%organization_id, run_id = %latest.id(), "research run still live");
                return Ok(false);
            }
            if latest.status() == ResearchRunStatus::Running {
                latest.fail(RESEARCH_TIMED_OUT, ctx.clock());
                self.research_runs.update(&latest).await?;
                warn!(%organization_id, run_id = %latest.id(), "research run timed out");
            }
            if now - latest.started_at() < config.research_interval() {
                return Ok(false);
            }
        }

        let mut run = ResearchRun::start(organization_id, ctx.clock());
        self.research_runs.store(&run).await?;
        let spec = TaskSpec::new(
            organization_id,
            AgentRole::Orchestrator,
            AgentRole::Research,
            TaskKind::ResearchContent,
            "Scheduled content research",
        )
        .with_input(json!({ "run_id": run.id() }));
        let task_id = ctx.begin(spec).await?;
        let outcome = self
            .researcher
            .research(organization_id)
            .await
            .map_err(|err| err.to_string());
        match &outcome {
            Ok(summary) => run.complete(summary.as_str(), ctx.clock()),
            Err(reason) => run.fail(reason.as_str(), ctx.clock()),
        }
        self.research_runs.update(&run).await?;
        match outcome {
            Ok(summary) => {
                ctx.queue()
                    .complete(task_id, json!({ "run_id": run.id(), "summary": summary }))
                    .await?;
                info!(%organization_id, run_id = %run.id(), "research run completed");
                Ok(true)
            }
            Err(reason) => {
                ctx.queue().fail(task_id, reason.as_str()).await?;
                warn!(%organization_id, run_id = %run.id(), error = %reason, "research run failed");
                Ok(true)
            }
        }
    }

    pub(super) async fn sweep_stale_tasks(&self) -> Result<SweepTally, LifecycleError> {
        let ctx = self.context();
        let now = ctx.clock().utc();
        let tasks = ctx.stores().tasks.as_ref();
        let mut stale = Vec::new();
        for task in tasks.list_by_status(TaskStatus::Pending).await? {
            if is_overdue(&task, now, ctx.config().pending_task_timeout()) {
                stale.push(task);
            }
        }
        for task in tasks.list_by_status(TaskStatus::Processing).await? {
            if is_overdue(&task, now, ctx.config().processing_task_timeout()) {
                stale.push(task);
            }
        }

        let mut tally = SweepTally::default();
        for task in stale {
            let task_id = task.id();
            match self.recover(&task).await {
                Ok(()) => tally.record(true),
                Err(err) => {
                    warn!(%task_id, error = %err, "stale task recovery failed");
                    tally.record_failure();
                }
            }
        }
        Ok(tally)
    }

    async fn recover(&self, task: &Task) -> Result<(), TaskQueueError> {
        let ctx = self.context();
        let config = ctx.config();
        let queue = ctx.queue();
        let retryable = config.is_idempotent(task.target_role())
            && task.attempt() < config.max_task_recoveries();
        if retryable {
            queue.fail(task.id(), SUPERSEDED_REASON).await?;
            let replacement = queue.create_task(task.retry_spec()).await?;
            info!(
                task_id = %task.id(),
                %replacement,
                kind = %task.kind(),
                attempt = task.attempt().saturating_add(1),
                "stale task retried"
            );
        } else {
            queue.fail(task.id(), MANUAL_REVIEW_REASON).await?;
            warn!(
                task_id = %task.id(),
                kind = %task.kind(),
                role = %task.target_role(),
                attempt = task.attempt(),
                "stale task sent to manual review"
            );
        }
        Ok(())
    }
}

fn is_overdue(task: &Task, now: DateTime<Utc>, timeout: Duration) -> bool {
    now - task.status_since() > timeout
}
