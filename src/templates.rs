//! Built-in message templates for the texts the pipeline writes itself.
//!
//! Reasoning-drafted messages (outreach, negotiation replies) are produced by
//! the reasoning service. Everything the pipeline sends on its own schedule
//! (follow-ups, nudges, satisfaction checks) or substitutes for an overridden
//! decision is rendered here with `minijinja`.

use minijinja::{Environment, context};
use std::sync::Arc;
use thiserror::Error;

const FOLLOW_UP: &str = "\
Hello {{ contact }},

I wanted to follow up on the proposal we sent {{ company }}{% if total %} \
(total {{ total }}){% endif %}. Is there anything we can clarify or adjust?

This is follow-up {{ attempt }} of {{ max_attempts }}.";

const NUDGE: &str = "\
Hello {{ contact }},

Just checking in to see whether {{ company }} had a chance to look at our \
previous message. Happy to answer any questions.";

const SATISFACTION: &str = "\
Hello {{ contact }},

It has been a while since {{ company }} started working with us{% if invoice_ref %} \
(invoice {{ invoice_ref }}){% endif %}. How satisfied are you so far? \
Any feedback is welcome.";

const HOLDING_REPLY: &str = "\
Hello {{ contact }},

Thank you for your message. Before we talk numbers we would like to make \
sure we understand what {{ company }} needs. Could you tell us a little more \
about your requirements?";

const ROUNDS_EXHAUSTED: &str = "\
Hello {{ contact }},

Thank you for the conversations so far. As we have not been able to agree \
on terms after {{ rounds }} rounds, we will close this proposal for now. \
We would be glad to hear from {{ company }} again in the future.";

const INVOICE_CONFIRMATION: &str = "\
Hello {{ contact }},

Thank you for accepting our offer. Please find invoice {{ invoice_ref }} \
for {{ total }} attached.";

/// Identifies a built-in template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTemplate {
    /// Follow-up on an unanswered offer.
    FollowUp,
    /// Nudge for an early-stage deal gone quiet.
    Nudge,
    /// Satisfaction check after a won deal.
    Satisfaction,
    /// Reply used when pricing is withheld.
    HoldingReply,
    /// Reply used when the negotiation round budget runs out.
    RoundsExhausted,
    /// Mail accompanying an issued invoice.
    InvoiceConfirmation,
}

impl MessageTemplate {
    /// Returns the template's registry name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FollowUp => "follow_up",
            Self::Nudge => "nudge",
            Self::Satisfaction => "satisfaction",
            Self::HoldingReply => "holding_reply",
            Self::RoundsExhausted => "rounds_exhausted",
            Self::InvoiceConfirmation => "invoice_confirmation",
        }
    }

    const fn source(self) -> &'static str {
        match self {
            Self::FollowUp => FOLLOW_UP,
            Self::Nudge => NUDGE,
            Self::Satisfaction => SATISFACTION,
            Self::HoldingReply => HOLDING_REPLY,
            Self::RoundsExhausted => ROUNDS_EXHAUSTED,
            Self::InvoiceConfirmation => INVOICE_CONFIRMATION,
        }
    }

    const ALL: [Self; 6] = [
        Self::FollowUp,
        Self::Nudge,
        Self::Satisfaction,
        Self::HoldingReply,
        Self::RoundsExhausted,
        Self::InvoiceConfirmation,
    ];
}

/// Values available to every template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    /// Salutation name; the company name when no contact is known.
    pub contact: String,
    /// Counterpart company.
    pub company: String,
    /// Formatted offer or invoice total.
    pub total: Option<String>,
    /// Invoice reference.
    pub invoice_ref: Option<String>,
    /// Follow-up attempt number.
    pub attempt: u32,
    /// Follow-up budget.
    pub max_attempts: u32,
    /// Negotiation rounds used.
    pub rounds: u32,
}

impl TemplateContext {
    /// Creates a context addressed to `contact` at `company`.
    #[must_use]
    pub fn new(contact: Option<&str>, company: &str) -> Self {
        Self {
            contact: contact.unwrap_or(company).to_owned(),
            company: company.to_owned(),
            ..Self::default()
        }
    }
}

/// Template rendering failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to render template {template}: {reason}")]
pub struct TemplateError {
    /// Template name.
    pub template: &'static str,
    /// Rendering failure reason.
    pub reason: String,
}

/// Renders the built-in templates.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    environment: Arc<Environment<'static>>,
}

impl MessageTemplates {
    /// Loads the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when a built-in template fails to compile.
    pub fn new() -> Result<Self, TemplateError> {
        let mut environment = Environment::new();
        for template in MessageTemplate::ALL {
            environment
                .add_template(template.name(), template.source())
                .map_err(|error| TemplateError {
                    template: template.name(),
                    reason: error.to_string(),
                })?;
        }
        Ok(Self {
            environment: Arc::new(environment),
        })
    }

    /// Renders `template` with `values`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when rendering fails.
    pub fn render(
        &self,
        template: MessageTemplate,
        values: &TemplateContext,
    ) -> Result<String, TemplateError> {
        let failed = |error: minijinja::Error| TemplateError {
            template: template.name(),
            reason: error.to_string(),
        };
        let compiled = self
            .environment
            .get_template(template.name())
            .map_err(failed)?;
        compiled
            .render(context! {
                contact => values.contact.as_str(),
                company => values.company.as_str(),
                total => values.total.as_deref(),
                invoice_ref => values.invoice_ref.as_deref(),
                attempt => values.attempt,
                max_attempts => values.max_attempts,
                rounds => values.rounds,
            })
            .map_err(failed)
    }
}
