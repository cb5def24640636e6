//! Runs one negotiation round through the reasoning service.

use crate::config::PipelineConfig;
use crate::deal::domain::{Deal, DealDomainError, Lead, Pricing};
use crate::negotiation::domain::{
    Guardrail, NegotiationAction, NegotiationDecision, RoundLimits, apply_guardrails,
};
use crate::reasoning::{
    domain::{ReasoningPrompt, ReasoningStep},
    ports::{ReasoningError, ReasoningService},
    services::StructuredReasoner,
};
use crate::templates::{MessageTemplate, MessageTemplates, TemplateContext, TemplateError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

const NEGOTIATION_INSTRUCTIONS: &str = "\
You negotiate a B2B sale by email. Classify the counterpart's latest reply and \
draft our answer. Respond with one JSON object with the fields: \
\"action\" (one of discovery, engaged, wants_offer, accepted, counter, new_offer, declined), \
\"subject\", \"body\", and for wants_offer, counter and new_offer an \"offer\" object \
with \"product\", \"quantity\", \"unit_price\" (decimal string, before tax) and an \
optional \"summary\". For declined, add a short \"reason\".";

/// Negotiation step failures.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The reasoning service failed or answered outside the schema.
    #[error(transparent)]
    Reasoning(#[from] ReasoningError),
    /// The drafted terms could not be priced.
    #[error("drafted offer is invalid: {0}")]
    InvalidDraft(#[from] DealDomainError),
    /// A substitute reply could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Everything one round needs to know about the conversation.
#[derive(Debug, Clone, Copy)]
pub struct NegotiationInput<'a> {
    /// Deal being negotiated.
    pub deal: &'a Deal,
    /// Counterpart and accumulated profile.
    pub lead: &'a Lead,
    /// Inbound subject.
    pub inbound_subject: &'a str,
    /// Inbound body.
    pub inbound_body: &'a str,
    /// Round this reply is processed as.
    pub round: u32,
}

/// Result of one round after guardrails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationOutcome {
    /// Action that stands.
    pub action: NegotiationAction,
    /// Reply subject.
    pub subject: String,
    /// Reply body.
    pub body: String,
    /// Round the reply was processed as.
    pub round: u32,
    /// Guardrail that overrode the proposed action, if any.
    pub guardrail: Option<Guardrail>,
    /// Pricing of the drafted terms, for pricing actions.
    pub pricing: Option<Pricing>,
}

/// Negotiation step backed by a reasoning service.
pub struct NegotiationStep<S>
where
    S: ReasoningService + ?Sized,
{
    reasoner: StructuredReasoner<S>,
    templates: MessageTemplates,
}

impl<S> NegotiationStep<S>
where
    S: ReasoningService + ?Sized,
{
    /// Creates the step.
    #[must_use]
    pub const fn new(reasoning: Arc<S>, templates: MessageTemplates) -> Self {
        Self {
            reasoner: StructuredReasoner::new(reasoning),
            templates,
        }
    }

    /// Decides the response to one inbound reply.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError`] when reasoning fails twice, the drafted
    /// terms are invalid, or a substitute reply cannot be rendered.
    pub async fn negotiate(
        &self,
        input: &NegotiationInput<'_>,
        config: &PipelineConfig,
    ) -> Result<NegotiationOutcome, NegotiationError> {
        let prompt = build_prompt(input, config);
        let decision: NegotiationDecision = self.reasoner.decide(&prompt).await?;
        let proposed = decision.action.tag();

        let limits = RoundLimits {
            round: input.round,
            max_rounds: config.max_negotiation_rounds(),
            min_replies_before_offer: config.min_replies_before_offer(),
            lead_informed: input.lead.profile().informed_about_offering,
        };
        let (action, guardrail) = apply_guardrails(decision.action, &limits);

        let body = match guardrail {
            Some(applied) => {
                warn!(
                    deal_id = %input.deal.id(),
                    round = input.round,
                    %proposed,
                    guardrail = ?applied,
                    "negotiation action overridden"
                );
                self.substitute_body(applied, input)?
            }
            None => decision.body,
        };
        let pricing = action
            .offer()
            .map(|offer| offer.price(config.tax_rate()))
            .transpose()?;

        info!(
            deal_id = %input.deal.id(),
            round = input.round,
            action = %action.tag(),
            "negotiation round decided"
        );
        Ok(NegotiationOutcome {
            action,
            subject: decision.subject,
            body,
            round: input.round,
            guardrail,
            pricing,
        })
    }

    fn substitute_body(
        &self,
        guardrail: Guardrail,
        input: &NegotiationInput<'_>,
    ) -> Result<String, TemplateError> {
        let lead = input.lead;
        let values = TemplateContext {
            rounds: input.round,
            ..TemplateContext::new(lead.contact_name(), lead.company_name())
        };
        let template = match guardrail {
            Guardrail::RoundsExhausted => MessageTemplate::RoundsExhausted,
            Guardrail::PricingLocked => MessageTemplate::HoldingReply,
        };
        self.templates.render(template, &values)
    }
}

fn build_prompt(input: &NegotiationInput<'_>, config: &PipelineConfig) -> ReasoningPrompt {
    let lead = input.lead;
    let profile = lead.profile();
    let mut lines = vec![format!("Company: {}", lead.company_name())];
    if let Some(industry) = &profile.industry {
        lines.push(format!("Industry: {industry}"));
    }
    lines.extend(profile.notes.iter().map(|note| format!("Note: {note}")));
    lines.push(format!(
        "Round {} of {}. Deal status: {}.",
        input.round,
        config.max_negotiation_rounds(),
        input.deal.status()
    ));
    if let Some(pricing) = input.deal.pricing() {
        lines.push(format!("Standing offer total: {}", pricing.total()));
    }
    lines.push(String::new());
    lines.push(format!("Subject: {}", input.inbound_subject));
    lines.push(String::new());
    lines.push(input.inbound_body.to_owned());
    ReasoningPrompt::new(
        ReasoningStep::Negotiation,
        NEGOTIATION_INSTRUCTIONS,
        lines.join("\n"),
    )
}
