//! Pipeline wiring shared by unit tests.

use crate::clock::ManualClock;
use crate::config::PipelineConfig;
use crate::deal::domain::{Deal, DealId, Lead, LeadProfile, NewLead, OfferEdits, OrganizationId};
use crate::lifecycle::{
    adapters::memory::{CannedResearcher, InMemoryResearchRunRepository},
    domain::{SweepKind, SweepOutcome, SweepTally},
    services::LifecyclePoller,
};
use crate::reasoning::adapters::memory::ScriptedReasoner;
use crate::task::domain::{Task, TaskKind};
use crate::workflow::{
    adapters::memory::{RecordingInvoiceIssuer, RecordingTransport, StaticDocumentGenerator},
    domain::{InboundMessage, ReplyOutcome},
    services::{Collaborators, PipelineContext, PipelineStores, WorkflowEngine},
};
use chrono::{Duration, TimeZone, Utc};
use mockable::Clock;
use serde_json::{Value, json};
use std::sync::Arc;

pub(crate) const OUTREACH: &str = r#"{"subject": "Hello from us", "body": "A short introduction."}"#;

/// Renders a negotiation decision as the reasoning service would.
pub(crate) fn decision(action: &str, extra: &Value) -> String {
    let mut body = json!({
        "action": action,
        "subject": "Re: our proposal",
        "body": format!("Reply for {action}"),
    });
    if let (Some(target), Some(fields)) = (body.as_object_mut(), extra.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    body.to_string()
}

/// A pricing decision for `quantity` units at `unit_price`.
pub(crate) fn priced(action: &str, quantity: u32, unit_price: &str) -> String {
    decision(
        action,
        &json!({
            "offer": {"product": "Fleet licence", "quantity": quantity, "unit_price": unit_price}
        }),
    )
}

pub(crate) struct PipelineHarness {
    pub reasoner: Arc<ScriptedReasoner>,
    pub transport: Arc<RecordingTransport>,
    pub documents: Arc<StaticDocumentGenerator>,
    pub invoices: Arc<RecordingInvoiceIssuer>,
    pub stores: PipelineStores,
    pub clock: Arc<ManualClock>,
    pub context: PipelineContext<ManualClock>,
    pub engine: WorkflowEngine<ManualClock>,
    pub organization_id: OrganizationId,
    replies: std::sync::atomic::AtomicU32,
}

impl PipelineHarness {
    pub(crate) fn new(config: PipelineConfig) -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        let clock = Arc::new(ManualClock::new(start));
        let reasoner = Arc::new(ScriptedReasoner::new());
        let transport = Arc::new(RecordingTransport::new());
        let documents = Arc::new(StaticDocumentGenerator::new());
        let invoices = Arc::new(RecordingInvoiceIssuer::new());
        let stores = PipelineStores::in_memory();
        let collaborators = Collaborators {
            reasoning: Arc::clone(&reasoner) as _,
            transport: Arc::clone(&transport) as _,
            documents: Arc::clone(&documents) as _,
            invoices: Arc::clone(&invoices) as _,
        };
        let context =
            PipelineContext::new(stores.clone(), collaborators, config, Arc::clone(&clock))
                .expect("built-in templates compile");
        Self {
            engine: WorkflowEngine::new(context.clone()),
            reasoner,
            transport,
            documents,
            invoices,
            stores,
            clock,
            context,
            organization_id: OrganizationId::new(),
            replies: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub(crate) async fn lead(&self, informed: bool) -> Lead {
        let profile = LeadProfile {
            industry: Some("Logistics".to_owned()),
            informed_about_offering: informed,
            ..LeadProfile::default()
        };
        self.engine
            .register_lead(
                self.organization_id,
                NewLead::new("Acme Freight", "buyer@acme.example")
                    .with_contact_name("Dana")
                    .with_profile(profile),
            )
            .await
            .expect("lead registers")
    }

    /// Registers a lead and sends the first outreach.
    pub(crate) async fn open_deal(&self, informed: bool) -> (Lead, DealId) {
        let lead = self.lead(informed).await;
        self.reasoner.push_response(OUTREACH);
        let deal_id = self
            .engine
            .trigger_workflow(self.organization_id, lead.id())
            .await
            .expect("outreach succeeds");
        (lead, deal_id)
    }

    /// Places a new, distinct reply from the lead in the inbox.
    pub(crate) fn reply(&self, lead: &Lead, body: &str) {
        let sequence = self
            .replies
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.transport.deliver_reply(
            lead.email(),
            InboundMessage::new(
                Some(format!("<reply-{sequence}@acme.example>")),
                lead.email(),
                "Re: Hello from us",
                body,
                self.clock.utc(),
            ),
        );
    }

    pub(crate) async fn deal(&self, deal_id: DealId) -> Deal {
        self.stores
            .deals
            .find(self.organization_id, deal_id)
            .await
            .expect("deal lookup succeeds")
            .expect("deal exists")
    }

    pub(crate) async fn tasks(&self, deal_id: DealId) -> Vec<Task> {
        self.context
            .queue()
            .tasks_for_deal(deal_id)
            .await
            .expect("task lookup succeeds")
    }

    pub(crate) async fn tasks_of_kind(&self, deal_id: DealId, kind: TaskKind) -> Vec<Task> {
        self.tasks(deal_id)
            .await
            .into_iter()
            .filter(|task| task.kind() == kind)
            .collect()
    }

    /// Processes the latest reply, expecting success.
    pub(crate) async fn process(&self, deal_id: DealId) -> ReplyOutcome {
        self.engine
            .check_reply(self.organization_id, deal_id)
            .await
            .expect("reply processing succeeds")
    }

    /// Opens a deal for an informed lead and negotiates it to a pending
    /// offer of five units at 100.00.
    pub(crate) async fn pending_offer_deal(&self) -> (Lead, DealId) {
        let (lead, deal_id) = self.open_deal(true).await;
        self.reply(&lead, "Tell me more.");
        self.reasoner.push_response(decision("discovery", &json!({})));
        self.process(deal_id).await;
        self.reply(&lead, "What would five seats cost?");
        self.reasoner.push_response(priced("wants_offer", 5, "100.00"));
        self.process(deal_id).await;
        (lead, deal_id)
    }

    /// Negotiates a deal to `offer_sent` by approving the pending offer
    /// unchanged.
    pub(crate) async fn sent_offer_deal(&self) -> (Lead, DealId) {
        let (lead, deal_id) = self.pending_offer_deal().await;
        self.engine
            .approve_offer(self.organization_id, deal_id, &OfferEdits::new())
            .await
            .expect("approval succeeds");
        (lead, deal_id)
    }

    /// Negotiates a deal to `closed_won` by accepting the sent offer.
    pub(crate) async fn won_deal(&self) -> (Lead, DealId) {
        let (lead, deal_id) = self.sent_offer_deal().await;
        self.reply(&lead, "Agreed, please invoice us.");
        self.reasoner.push_response(decision("accepted", &json!({})));
        self.process(deal_id).await;
        (lead, deal_id)
    }

    /// Negotiates a deal to `closed_lost` by declining after outreach.
    pub(crate) async fn lost_deal(&self) -> (Lead, DealId) {
        let (lead, deal_id) = self.open_deal(false).await;
        self.reply(&lead, "Not interested, thanks.");
        self.reasoner.push_response(decision("declined", &json!({})));
        self.process(deal_id).await;
        (lead, deal_id)
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

/// A pipeline with a lifecycle poller over the same stores and clock.
pub(crate) struct PollerHarness {
    pub pipeline: PipelineHarness,
    pub research_runs: Arc<InMemoryResearchRunRepository>,
    pub researcher: Arc<CannedResearcher>,
    pub poller: Arc<LifecyclePoller<ManualClock>>,
}

impl PollerHarness {
    pub(crate) fn new(config: PipelineConfig) -> Self {
        let pipeline = PipelineHarness::new(config);
        let research_runs = Arc::new(InMemoryResearchRunRepository::new());
        let researcher = Arc::new(CannedResearcher::new());
        let poller = Arc::new(LifecyclePoller::new(
            pipeline.engine.clone(),
            Arc::clone(&research_runs) as _,
            Arc::clone(&researcher) as _,
        ));
        Self {
            pipeline,
            research_runs,
            researcher,
            poller,
        }
    }

    /// Runs one sweep, expecting it to complete.
    pub(crate) async fn sweep(&self, kind: SweepKind) -> SweepTally {
        match self.poller.run_sweep(kind).await.outcome {
            SweepOutcome::Completed(tally) => tally,
            other => panic!("{kind} sweep did not complete: {other:?}"),
        }
    }
}
