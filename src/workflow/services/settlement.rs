//! Closing a deal as won: invoice, record, confirm.

use crate::deal::domain::{Deal, DealId, DealStatus, Lead};
use crate::task::domain::{AgentRole, TaskKind, TaskSpec};
use crate::templates::{MessageTemplate, TemplateContext};
use crate::workflow::{
    domain::{Attachment, OutboundMessage},
    ports::{DocumentTemplate, InvoiceError},
    services::{PipelineContext, WorkflowResult},
};
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

/// Settles accepted deals.
///
/// Settlement is idempotent per deal: the deal id is the invoice idempotency
/// key, and a deal that already carries an invoice reference is never
/// invoiced again.
pub struct SettlementService<C>
where
    C: Clock + Send + Sync,
{
    context: PipelineContext<C>,
}

impl<C> Clone for SettlementService<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<C> SettlementService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates the service.
    #[must_use]
    pub const fn new(context: PipelineContext<C>) -> Self {
        Self { context }
    }

    /// Invoices the deal, closes it as won and persists it, then sends the
    /// confirmation mail.
    ///
    /// The confirmation is best-effort: its failure is logged and does not
    /// undo the settlement. Returns the invoice reference.
    ///
    /// # Errors
    ///
    /// Returns [`crate::workflow::services::WorkflowError`] when the invoice
    /// is rejected, the deal cannot close as won, or persistence fails.
    pub async fn settle(&self, deal: &mut Deal, lead: &Lead) -> WorkflowResult<String> {
        if let Some(existing) = deal.invoice_ref() {
            info!(deal_id = %deal.id(), invoice_ref = existing, "deal already invoiced");
            return Ok(existing.to_owned());
        }

        let ctx = &self.context;
        let spec = TaskSpec::new(
            deal.organization_id(),
            AgentRole::Orchestrator,
            AgentRole::Accounting,
            TaskKind::IssueInvoice,
            format!("Invoice {}", lead.company_name()),
        )
        .with_deal(deal.id())
        .with_lead(lead.id())
        .with_input(json!({ "deal_id": deal.id() }));
        let task_id = ctx.begin(spec).await?;
        let outcome = self.invoice_and_close(deal, lead).await;
        let invoice_ref = ctx.finish(task_id, outcome).await?;

        self.send_confirmation(deal, lead, &invoice_ref).await;
        Ok(invoice_ref)
    }

    async fn invoice_and_close(
        &self,
        deal: &mut Deal,
        lead: &Lead,
    ) -> WorkflowResult<(String, serde_json::Value)> {
        let ctx = &self.context;
        let key = deal.id().to_string();
        let (invoice_ref, fallback) =
            match ctx.collaborators().invoices.issue(deal, lead, &key).await {
                Ok(reference) => (reference, false),
                Err(InvoiceError::Unavailable(detail)) => {
                    let local = local_invoice_ref(deal.id(), ctx.clock());
                    warn!(
                        deal_id = %deal.id(),
                        %detail,
                        invoice_ref = %local,
                        "accounting unavailable, issuing local invoice number"
                    );
                    (local, true)
                }
                Err(err @ InvoiceError::Rejected(_)) => return Err(err.into()),
            };

        deal.record_invoice(invoice_ref.clone(), ctx.clock())?;
        deal.transition_to(DealStatus::ClosedWon, ctx.clock())?;
        ctx.stores().deals.update(deal).await?;
        info!(deal_id = %deal.id(), %invoice_ref, "deal settled");
        let output = json!({ "invoice_ref": invoice_ref, "local_fallback": fallback });
        Ok((invoice_ref, output))
    }

    async fn send_confirmation(&self, deal: &Deal, lead: &Lead, invoice_ref: &str) {
        if let Err(err) = self.try_send_confirmation(deal, lead, invoice_ref).await {
            warn!(deal_id = %deal.id(), error = %err, "invoice confirmation not sent");
        }
    }

    async fn try_send_confirmation(
        &self,
        deal: &Deal,
        lead: &Lead,
        invoice_ref: &str,
    ) -> WorkflowResult<()> {
        let ctx = &self.context;
        let document = ctx
            .collaborators()
            .documents
            .render(deal, lead, DocumentTemplate::Invoice)
            .await?;
        let values = TemplateContext {
            total: deal.pricing().map(|pricing| pricing.total().to_string()),
            invoice_ref: Some(invoice_ref.to_owned()),
            ..PipelineContext::<C>::template_context(lead)
        };
        let body = ctx
            .templates()
            .render(MessageTemplate::InvoiceConfirmation, &values)?;
        let message = OutboundMessage::new(lead.email(), format!("Invoice {invoice_ref}"), body)
            .with_attachment(Attachment::pdf(
                DocumentTemplate::Invoice.file_name(deal),
                document,
            ));
        ctx.deliver(&message).await?;
        Ok(())
    }
}

/// Local invoice number used when accounting is unreachable:
/// `LOCAL-<yyyymmdd>-<first 8 hex digits of the deal id>`.
#[must_use]
pub fn local_invoice_ref(deal_id: DealId, clock: &impl Clock) -> String {
    let hex: String = deal_id
        .into_inner()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect();
    format!("LOCAL-{}-{hex}", clock.utc().format("%Y%m%d"))
}
