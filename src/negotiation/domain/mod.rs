//! Negotiation actions and guardrails.

mod action;
mod guardrail;

pub use action::{ActionTag, NegotiationAction, NegotiationDecision};
pub use guardrail::{Guardrail, ROUNDS_EXHAUSTED_REASON, RoundLimits, apply_guardrails};
