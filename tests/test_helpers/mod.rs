//! Shared pipeline wiring for integration and behaviour tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use mercator::{
    clock::ManualClock,
    config::PipelineConfig,
    deal::domain::{Deal, DealId, Lead, LeadProfile, NewLead, OrganizationId},
    lifecycle::{
        adapters::memory::{CannedResearcher, InMemoryResearchRunRepository},
        services::LifecyclePoller,
    },
    reasoning::adapters::memory::ScriptedReasoner,
    workflow::{
        adapters::memory::{RecordingInvoiceIssuer, RecordingTransport, StaticDocumentGenerator},
        domain::{InboundMessage, ReplyOutcome},
        services::{Collaborators, PipelineContext, PipelineStores, WorkflowEngine},
    },
};
use rstest::fixture;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Outreach draft as the reasoning service would return it.
pub const OUTREACH: &str = r#"{"subject": "Hello from Mercator", "body": "A short introduction."}"#;

/// A negotiation decision with optional extra fields.
#[must_use]
pub fn decision(action: &str, extra: &Value) -> String {
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

/// A pricing decision for `quantity` seats at `unit_price`.
#[must_use]
pub fn priced(action: &str, quantity: u32, unit_price: &str) -> String {
    decision(
        action,
        &json!({
            "offer": {"product": "Route planner", "quantity": quantity, "unit_price": unit_price}
        }),
    )
}

/// First instant of every simulated run.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A complete in-memory pipeline on simulated time.
pub struct Pipeline {
    pub reasoner: Arc<ScriptedReasoner>,
    pub transport: Arc<RecordingTransport>,
    pub documents: Arc<StaticDocumentGenerator>,
    pub invoices: Arc<RecordingInvoiceIssuer>,
    pub researcher: Arc<CannedResearcher>,
    pub stores: PipelineStores,
    pub clock: Arc<ManualClock>,
    pub engine: WorkflowEngine<ManualClock>,
    pub poller: Arc<LifecyclePoller<ManualClock>>,
    pub organization_id: OrganizationId,
    replies: AtomicU32,
}

impl Pipeline {
    /// Wires a pipeline with `config`.
    ///
    /// # Errors
    ///
    /// Returns an error when the built-in templates fail to compile.
    pub fn new(config: PipelineConfig) -> Result<Self, eyre::Report> {
        let clock = Arc::new(ManualClock::new(epoch()));
        let reasoner = Arc::new(ScriptedReasoner::new());
        let transport = Arc::new(RecordingTransport::new());
        let documents = Arc::new(StaticDocumentGenerator::new());
        let invoices = Arc::new(RecordingInvoiceIssuer::new());
        let researcher = Arc::new(CannedResearcher::new());
        let stores = PipelineStores::in_memory();
        let collaborators = Collaborators {
            reasoning: Arc::clone(&reasoner) as _,
            transport: Arc::clone(&transport) as _,
            documents: Arc::clone(&documents) as _,
            invoices: Arc::clone(&invoices) as _,
        };
        let context =
            PipelineContext::new(stores.clone(), collaborators, config, Arc::clone(&clock))?;
        let engine = WorkflowEngine::new(context);
        let poller = Arc::new(LifecyclePoller::new(
            engine.clone(),
            Arc::new(InMemoryResearchRunRepository::new()),
            Arc::clone(&researcher) as _,
        ));
        Ok(Self {
            reasoner,
            transport,
            documents,
            invoices,
            researcher,
            stores,
            clock,
            engine,
            poller,
            organization_id: OrganizationId::new(),
            replies: AtomicU32::new(0),
        })
    }

    /// Registers an informed lead and sends the first outreach.
    ///
    /// # Errors
    ///
    /// Returns an error when registration or outreach fails.
    pub async fn open_deal(&self) -> Result<(Lead, DealId), eyre::Report> {
        let profile = LeadProfile {
            industry: Some("Freight".to_owned()),
            informed_about_offering: true,
            ..LeadProfile::default()
        };
        let lead = self
            .engine
            .register_lead(
                self.organization_id,
                NewLead::new("Northwind Haulage", "ops@northwind.example")
                    .with_contact_name("Sam")
                    .with_profile(profile),
            )
            .await?;
        self.reasoner.push_response(OUTREACH);
        let deal_id = self
            .engine
            .trigger_workflow(self.organization_id, lead.id())
            .await?;
        Ok((lead, deal_id))
    }

    /// Delivers a reply and processes it with the scripted `decision`.
    ///
    /// # Errors
    ///
    /// Returns an error when reply processing fails.
    pub async fn answer(
        &self,
        lead: &Lead,
        deal_id: DealId,
        body: &str,
        decision: String,
    ) -> Result<ReplyOutcome, eyre::Report> {
        let sequence = self.replies.fetch_add(1, Ordering::SeqCst);
        self.transport.deliver_reply(
            lead.email(),
            InboundMessage::new(
                Some(format!("<reply-{sequence}@northwind.example>")),
                lead.email(),
                "Re: Hello from Mercator",
                body,
                mockable::Clock::utc(&*self.clock),
            ),
        );
        self.reasoner.push_response(decision);
        Ok(self
            .engine
            .check_reply(self.organization_id, deal_id)
            .await?)
    }

    /// Loads a deal of this pipeline's organisation.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup fails or the deal is missing.
    pub async fn deal(&self, deal_id: DealId) -> Result<Deal, eyre::Report> {
        self.stores
            .deals
            .find(self.organization_id, deal_id)
            .await?
            .ok_or_else(|| eyre::eyre!("deal {deal_id} not found"))
    }

    /// Moves simulated time forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

/// A pipeline with default thresholds.
///
/// # Errors
///
/// Returns an error when the pipeline cannot be wired.
#[fixture]
pub fn pipeline() -> Result<Pipeline, eyre::Report> {
    Pipeline::new(PipelineConfig::default())
}
