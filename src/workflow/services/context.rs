//! Stores, collaborators and shared services handed to every pipeline stage.

use crate::config::PipelineConfig;
use crate::deal::{
    adapters::memory::{
        InMemoryDealRepository, InMemoryLeadRepository, InMemoryPendingOfferRepository,
    },
    domain::{Deal, DealId, Lead, LeadId, OrganizationId, PendingOfferId},
    ports::{DealRepository, LeadRepository, PendingOfferRepository},
};
use crate::reasoning::ports::ReasoningService;
use crate::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{TaskId, TaskKind, TaskSpec},
    ports::TaskRepository,
    services::TaskQueueService,
};
use crate::templates::{MessageTemplates, TemplateContext, TemplateError};
use crate::workflow::{
    domain::{DeliveryReceipt, OfferResolution, OutboundMessage},
    ports::{DocumentGenerator, InvoiceIssuer, MessageTransport},
    services::{WorkflowError, WorkflowResult},
};
use mockable::Clock;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Repositories the pipeline reads and writes.
#[derive(Clone)]
pub struct PipelineStores {
    /// Task queue storage.
    pub tasks: Arc<dyn TaskRepository>,
    /// Deal storage.
    pub deals: Arc<dyn DealRepository>,
    /// Lead storage.
    pub leads: Arc<dyn LeadRepository>,
    /// Pending offer storage.
    pub offers: Arc<dyn PendingOfferRepository>,
}

impl PipelineStores {
    /// Creates a set of empty in-memory stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            tasks: Arc::new(InMemoryTaskRepository::new()),
            deals: Arc::new(InMemoryDealRepository::new()),
            leads: Arc::new(InMemoryLeadRepository::new()),
            offers: Arc::new(InMemoryPendingOfferRepository::new()),
        }
    }
}

/// External systems the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Drafts outreach and negotiation replies.
    pub reasoning: Arc<dyn ReasoningService>,
    /// Sends mail and reads replies.
    pub transport: Arc<dyn MessageTransport>,
    /// Renders offer and invoice documents.
    pub documents: Arc<dyn DocumentGenerator>,
    /// Issues invoices.
    pub invoices: Arc<dyn InvoiceIssuer>,
}

/// Everything a pipeline stage needs, cheap to clone.
pub struct PipelineContext<C>
where
    C: Clock + Send + Sync,
{
    stores: PipelineStores,
    collaborators: Collaborators,
    queue: TaskQueueService<dyn TaskRepository, C>,
    config: Arc<PipelineConfig>,
    templates: MessageTemplates,
    clock: Arc<C>,
}

impl<C> Clone for PipelineContext<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            stores: self.stores.clone(),
            collaborators: self.collaborators.clone(),
            queue: self.queue.clone(),
            config: Arc::clone(&self.config),
            templates: self.templates.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C> PipelineContext<C>
where
    C: Clock + Send + Sync,
{
    /// Wires stores and collaborators together.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when a built-in template fails to compile.
    pub fn new(
        stores: PipelineStores,
        collaborators: Collaborators,
        config: PipelineConfig,
        clock: Arc<C>,
    ) -> Result<Self, TemplateError> {
        let queue = TaskQueueService::new(Arc::clone(&stores.tasks), Arc::clone(&clock));
        Ok(Self {
            stores,
            collaborators,
            queue,
            config: Arc::new(config),
            templates: MessageTemplates::new()?,
            clock,
        })
    }

    /// Returns the repositories.
    #[must_use]
    pub const fn stores(&self) -> &PipelineStores {
        &self.stores
    }

    /// Returns the collaborators.
    #[must_use]
    pub const fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Returns the task queue.
    #[must_use]
    pub const fn queue(&self) -> &TaskQueueService<dyn TaskRepository, C> {
        &self.queue
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the message templates.
    #[must_use]
    pub const fn templates(&self) -> &MessageTemplates {
        &self.templates
    }

    /// Returns the clock.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Returns the shared clock handle.
    #[must_use]
    pub const fn clock_handle(&self) -> &Arc<C> {
        &self.clock
    }

    /// Loads a deal within an organisation.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::DealNotFound`] when it does not exist there.
    pub async fn load_deal(
        &self,
        organization_id: OrganizationId,
        deal_id: DealId,
    ) -> WorkflowResult<Deal> {
        self.stores
            .deals
            .find(organization_id, deal_id)
            .await?
            .ok_or(WorkflowError::DealNotFound(deal_id))
    }

    /// Loads a lead within an organisation.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::LeadNotFound`] when it does not exist there.
    pub async fn load_lead(
        &self,
        organization_id: OrganizationId,
        lead_id: LeadId,
    ) -> WorkflowResult<Lead> {
        self.stores
            .leads
            .find(organization_id, lead_id)
            .await?
            .ok_or(WorkflowError::LeadNotFound(lead_id))
    }

    /// Sends `message`, treating an undelivered receipt as an error.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Delivery`] when the transport reports failure.
    pub async fn deliver(&self, message: &OutboundMessage) -> WorkflowResult<DeliveryReceipt> {
        let receipt = self.collaborators.transport.send(message).await;
        if receipt.sent {
            Ok(receipt)
        } else {
            Err(WorkflowError::Delivery(
                receipt
                    .error
                    .unwrap_or_else(|| "transport reported no error detail".to_owned()),
            ))
        }
    }

    /// Creates and claims a task for work the caller runs immediately.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Queue`] when the task cannot be stored.
    pub async fn begin(&self, spec: TaskSpec) -> WorkflowResult<TaskId> {
        Ok(self.queue.create_and_track(spec).await?)
    }

    /// Terminates a task begun with [`PipelineContext::begin`] from the
    /// outcome of its work, and passes the outcome on.
    ///
    /// A failure to record the termination is logged; the work's own error
    /// takes precedence.
    ///
    /// # Errors
    ///
    /// Returns the work's error, or [`WorkflowError::Queue`] when a
    /// successful outcome cannot be recorded.
    pub async fn finish<T>(
        &self,
        task_id: TaskId,
        outcome: WorkflowResult<(T, Value)>,
    ) -> WorkflowResult<T> {
        match outcome {
            Ok((value, output)) => {
                self.queue.complete(task_id, output).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(record_err) = self.queue.fail(task_id, err.to_string()).await {
                    warn!(%task_id, error = %record_err, "could not record task failure");
                }
                Err(err)
            }
        }
    }

    /// Terminates the open approval requests raised for `offer_id`.
    ///
    /// A reviewer's decision completes them; a superseded offer or a closed
    /// deal fails them. Failures are logged, since the offer itself is
    /// already resolved. Returns how many requests were closed.
    pub async fn close_approval_requests(
        &self,
        deal_id: DealId,
        offer_id: PendingOfferId,
        resolution: OfferResolution,
    ) -> usize {
        let tasks = match self.queue.tasks_for_deal(deal_id).await {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(%deal_id, %offer_id, error = %err, "could not list approval requests");
                return 0;
            }
        };
        let offer_ref = json!(offer_id);
        let mut closed = 0_usize;
        for task in tasks.iter().filter(|task| {
            task.kind() == TaskKind::NotifyOfferApproval
                && !task.status().is_terminal()
                && task.input().get("offer_id") == Some(&offer_ref)
        }) {
            let outcome = match resolution {
                OfferResolution::Approved | OfferResolution::Rejected => {
                    self.queue
                        .complete(task.id(), json!({ "resolved": resolution.as_str() }))
                        .await
                }
                OfferResolution::Superseded => self.queue.fail(task.id(), "offer superseded").await,
                OfferResolution::DealClosed => self.queue.fail(task.id(), "deal closed").await,
            };
            match outcome {
                Ok(_) => closed = closed.saturating_add(1),
                Err(err) => {
                    warn!(task_id = %task.id(), %offer_id, error = %err, "could not close approval request");
                }
            }
        }
        debug!(%deal_id, %offer_id, resolution = resolution.as_str(), closed, "approval requests closed");
        closed
    }

    /// Returns template values addressed to the lead.
    #[must_use]
    pub fn template_context(lead: &Lead) -> TemplateContext {
        TemplateContext::new(lead.contact_name(), lead.company_name())
    }
}
